//! Transfer Orchestrator
//!
//! Moves stock of one product between two locations as a single unit of work:
//! debit at the source, credit at the destination, and two linked movements.
//!
//! # Lock order
//!
//! Both balance rows are locked up front in ascending [`LocationId`] order,
//! whichever side is the source. Two concurrent transfers between the same
//! pair of locations in opposite directions therefore queue on the same first
//! lock instead of each holding one and waiting for the other.
//!
//! ```text
//! A -> B : lock min(A,B) -> lock max(A,B) -> debit A -> credit B -> log out/in
//! B -> A : lock min(A,B) -> lock max(A,B) -> debit B -> credit A -> log out/in
//! ```

use super::balance::BalanceManager;
use super::error::{LedgerError, TransferRejection};
use super::movement::MovementLogger;
use super::store::LedgerTx;
use super::types::{MovementType, TransferOutcome, TransferRequest};
use crate::core_types::LocationId;

pub struct TransferOrchestrator;

impl TransferOrchestrator {
    /// Preconditions checked before any lock is taken
    pub fn validate(req: &TransferRequest) -> Result<(), LedgerError> {
        if req.source_location_id == req.dest_location_id {
            return Err(LedgerError::InvalidTransfer(TransferRejection::SameLocation));
        }
        if req.quantity <= 0 {
            return Err(LedgerError::InvalidTransfer(
                TransferRejection::NonPositiveQuantity(req.quantity),
            ));
        }
        Ok(())
    }

    /// The two locations in global lock order
    pub fn lock_order(a: LocationId, b: LocationId) -> [LocationId; 2] {
        if a <= b { [a, b] } else { [b, a] }
    }

    /// Execute `req` inside `tx`.
    ///
    /// On error the caller must roll back `tx`; some writes may already be
    /// staged in it.
    pub async fn execute(
        tx: &mut dyn LedgerTx,
        req: TransferRequest,
    ) -> Result<TransferOutcome, LedgerError> {
        Self::validate(&req)?;

        let source = req.source_key();
        let dest = req.dest_key();

        let mut available = None;
        for location in Self::lock_order(req.source_location_id, req.dest_location_id) {
            let quantity = tx.lock_balance(source.with_location(location)).await?;
            if location == req.source_location_id {
                available = quantity;
            }
        }

        // 1. source must cover the full quantity; nothing written yet
        match available {
            Some(current) if current >= req.quantity => {}
            other => {
                return Err(LedgerError::InsufficientStock {
                    product_id: req.product_id,
                    location_id: req.source_location_id,
                    available: other.unwrap_or(0),
                    requested: req.quantity,
                });
            }
        }

        // 2. debit source
        let new_source_quantity = BalanceManager::apply_delta(tx, source, -req.quantity).await?;

        // 3. credit destination, creating its row if needed
        let new_dest_quantity = BalanceManager::apply_delta(tx, dest, req.quantity).await?;

        // 4. both halves of the ledger entry; the in-half points at the out-half
        let transfer_out_id = MovementLogger::record(
            tx,
            source,
            MovementType::TransferOut,
            -req.quantity,
            req.comment.clone(),
            None,
        )
        .await?;
        let transfer_in_id = MovementLogger::record(
            tx,
            dest,
            MovementType::TransferIn,
            req.quantity,
            req.comment,
            Some(transfer_out_id),
        )
        .await?;

        Ok(TransferOutcome {
            product_id: req.product_id,
            source_location_id: req.source_location_id,
            dest_location_id: req.dest_location_id,
            quantity: req.quantity,
            new_source_quantity,
            new_dest_quantity,
            transfer_out_id,
            transfer_in_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{BalanceKey, MovementId, ProductId};
    use crate::ledger::memory::MemoryLedgerStore;
    use crate::ledger::store::LedgerStore;
    use crate::ledger::types::{Movement, NewMovement};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    /// Wraps a unit of work and records the order keys are locked in
    struct RecordingTx {
        inner: Box<dyn LedgerTx>,
        locks: Arc<Mutex<Vec<LocationId>>>,
    }

    #[async_trait]
    impl LedgerTx for RecordingTx {
        async fn lock_balance(&mut self, key: BalanceKey) -> Result<Option<i64>, LedgerError> {
            self.locks.lock().unwrap().push(key.location_id);
            self.inner.lock_balance(key).await
        }

        async fn insert_balance(
            &mut self,
            key: BalanceKey,
            quantity: i64,
        ) -> Result<(), LedgerError> {
            self.inner.insert_balance(key, quantity).await
        }

        async fn update_balance(
            &mut self,
            key: BalanceKey,
            quantity: i64,
        ) -> Result<(), LedgerError> {
            self.inner.update_balance(key, quantity).await
        }

        async fn insert_movement(
            &mut self,
            movement: &NewMovement,
        ) -> Result<MovementId, LedgerError> {
            self.inner.insert_movement(movement).await
        }

        async fn movements(&mut self, key: BalanceKey) -> Result<Vec<Movement>, LedgerError> {
            self.inner.movements(key).await
        }

        async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
            self.inner.commit().await
        }

        async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
            self.inner.rollback().await
        }
    }

    fn location(n: u128) -> LocationId {
        LocationId(Uuid::from_u128(n))
    }

    #[test]
    fn test_validate_rejects_same_location() {
        let loc = LocationId::new();
        let req = TransferRequest::new(ProductId::new(), loc, loc, 5);
        assert_eq!(
            TransferOrchestrator::validate(&req),
            Err(LedgerError::InvalidTransfer(TransferRejection::SameLocation))
        );
    }

    #[test]
    fn test_validate_rejects_non_positive_quantity() {
        for qty in [0, -3] {
            let req = TransferRequest::new(ProductId::new(), location(1), location(2), qty);
            assert_eq!(
                TransferOrchestrator::validate(&req),
                Err(LedgerError::InvalidTransfer(
                    TransferRejection::NonPositiveQuantity(qty)
                ))
            );
        }
    }

    #[test]
    fn test_lock_order_ignores_direction() {
        let (a, b) = (location(1), location(2));
        assert_eq!(TransferOrchestrator::lock_order(a, b), [a, b]);
        assert_eq!(TransferOrchestrator::lock_order(b, a), [a, b]);
    }

    #[tokio::test]
    async fn test_locks_taken_in_ascending_order_for_both_directions() {
        let store = MemoryLedgerStore::new();
        let product = ProductId::new();
        let (low, high) = (location(10), location(20));

        // seed both sides
        let mut seed = store.begin().await.unwrap();
        for loc in [low, high] {
            BalanceManager::apply_delta(seed.as_mut(), BalanceKey::new(product, loc), 10)
                .await
                .unwrap();
        }
        seed.commit().await.unwrap();

        for (src, dst) in [(high, low), (low, high)] {
            let locks = Arc::new(Mutex::new(Vec::new()));
            let mut tx: Box<dyn LedgerTx> = Box::new(RecordingTx {
                inner: store.begin().await.unwrap(),
                locks: Arc::clone(&locks),
            });
            TransferOrchestrator::execute(tx.as_mut(), TransferRequest::new(product, src, dst, 1))
                .await
                .unwrap();
            tx.commit().await.unwrap();

            let order = locks.lock().unwrap().clone();
            assert_eq!(&order[..2], &[low, high], "first two locks follow global order");
        }
    }

    #[tokio::test]
    async fn test_insufficient_source_writes_nothing() {
        let store = MemoryLedgerStore::new();
        let product = ProductId::new();
        let (src, dst) = (location(1), location(2));

        let mut tx = store.begin().await.unwrap();
        let req = TransferRequest::new(product, src, dst, 1);
        let err = TransferOrchestrator::execute(tx.as_mut(), req)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                product_id: product,
                location_id: src,
                available: 0,
                requested: 1,
            }
        );
        tx.commit().await.unwrap();

        assert_eq!(store.balance(BalanceKey::new(product, dst)).await.unwrap(), None);
        assert!(store.movements(BalanceKey::new(product, src)).await.unwrap().is_empty());
    }
}
