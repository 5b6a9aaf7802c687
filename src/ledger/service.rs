//! Inventory Ledger service
//!
//! Boundary of the ledger. Each mutating operation runs in its own unit of
//! work, committed on success and rolled back on any error, so a caller never
//! observes a partial adjustment or transfer.

use std::sync::Arc;

use super::adjustment;
use super::error::LedgerError;
use super::store::{LedgerStore, LedgerTx};
use super::transfer::TransferOrchestrator;
use super::types::{
    AdjustmentOutcome, AdjustmentRequest, Movement, Reconciliation, StockLevel, TransferOutcome,
    TransferRequest,
};
use crate::core_types::{BalanceKey, LocationId, MovementId, ProductId};

/// Inventory ledger bound to one store
#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn LedgerStore>,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        tracing::info!(store = store.name(), "inventory ledger initialized");
        Self { store }
    }

    /// Single-location stock change
    ///
    /// # Errors
    /// - `InsufficientStock` if the balance would go negative
    /// - `QuantityOverflow`, `Storage`
    pub async fn adjust(&self, req: AdjustmentRequest) -> Result<AdjustmentOutcome, LedgerError> {
        let key = req.key();
        let delta = req.quantity_delta;
        let movement_type = req.movement_type.clone();

        let mut tx = self.store.begin().await?;
        let result = adjustment::adjust(tx.as_mut(), req).await;

        match finish(tx, result).await {
            Ok(outcome) => {
                tracing::info!(
                    %key,
                    delta,
                    %movement_type,
                    new_quantity = outcome.new_quantity,
                    movement_id = %outcome.movement_id,
                    "stock adjusted"
                );
                Ok(outcome)
            }
            Err(e) => {
                log_failure("adjust", &e);
                Err(e)
            }
        }
    }

    /// Move stock between two locations
    ///
    /// # Errors
    /// - `InvalidTransfer` for a same-location or non-positive request (no lock taken)
    /// - `InsufficientStock` if the source cannot cover the quantity
    /// - `QuantityOverflow`, `Storage`
    pub async fn transfer(&self, req: TransferRequest) -> Result<TransferOutcome, LedgerError> {
        if let Err(e) = TransferOrchestrator::validate(&req) {
            log_failure("transfer", &e);
            return Err(e);
        }

        let mut tx = self.store.begin().await?;
        let result = TransferOrchestrator::execute(tx.as_mut(), req).await;

        match finish(tx, result).await {
            Ok(outcome) => {
                tracing::info!(
                    product_id = %outcome.product_id,
                    from = %outcome.source_location_id,
                    to = %outcome.dest_location_id,
                    quantity = outcome.quantity,
                    new_source_quantity = outcome.new_source_quantity,
                    new_dest_quantity = outcome.new_dest_quantity,
                    transfer_out_id = %outcome.transfer_out_id,
                    transfer_in_id = %outcome.transfer_in_id,
                    "stock transferred"
                );
                Ok(outcome)
            }
            Err(e) => {
                log_failure("transfer", &e);
                Err(e)
            }
        }
    }

    /// Balances strictly below `threshold`, ordered by location then product
    pub async fn list_below_threshold(
        &self,
        threshold: i64,
    ) -> Result<Vec<StockLevel>, LedgerError> {
        self.store.below_threshold(threshold).await
    }

    /// Committed quantity, None if the pair has never held stock
    pub async fn balance(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Result<Option<i64>, LedgerError> {
        self.store.balance(BalanceKey::new(product_id, location_id)).await
    }

    /// Audit trail of one balance, oldest first
    pub async fn movements(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Result<Vec<Movement>, LedgerError> {
        self.store.movements(BalanceKey::new(product_id, location_id)).await
    }

    /// The other half of a transfer, following the correlation pointer in
    /// either direction. None for adjustments and unknown ids.
    pub async fn linked_movement(&self, id: MovementId) -> Result<Option<Movement>, LedgerError> {
        let Some(movement) = self.store.movement(id).await? else {
            return Ok(None);
        };
        if let Some(related) = movement.related_movement_id {
            return self.store.movement(related).await;
        }
        Ok(self.store.movements_related_to(id).await?.into_iter().next())
    }

    /// Replay the movement log of one pair and compare it with the stored balance.
    ///
    /// The balance key is locked while reading so no writer can commit to the
    /// pair between the two reads. Both reads go through the same unit.
    pub async fn reconcile(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Result<Reconciliation, LedgerError> {
        let key = BalanceKey::new(product_id, location_id);
        let mut tx = self.store.begin().await?;

        let result: Result<Reconciliation, LedgerError> = async {
            let balance = tx.lock_balance(key).await?;
            let movements = tx.movements(key).await?;
            Ok(Reconciliation::from_parts(key, balance, &movements))
        }
        .await;

        // read-only: always release
        if let Err(e) = tx.rollback().await {
            tracing::error!(error = %e, %key, "rollback after reconcile failed");
        }

        let reconciliation = result?;
        if !reconciliation.consistent {
            tracing::error!(
                %key,
                balance = ?reconciliation.balance,
                ledger_sum = reconciliation.ledger_sum,
                "balance does not match movement log"
            );
        }
        Ok(reconciliation)
    }

    pub async fn health_check(&self) -> Result<(), LedgerError> {
        self.store.health_check().await
    }
}

/// Commit on success, roll back on error. A failed rollback is logged and the
/// original error returned.
async fn finish<T: Send>(
    tx: Box<dyn LedgerTx>,
    result: Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

fn log_failure(operation: &'static str, e: &LedgerError) {
    if e.is_client_error() {
        tracing::warn!(operation, code = e.code(), error = %e, "ledger operation rejected");
    } else {
        tracing::error!(operation, code = e.code(), error = %e, "ledger operation failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryLedgerStore;
    use crate::ledger::types::MovementType;

    fn ledger() -> InventoryLedger {
        InventoryLedger::new(Arc::new(MemoryLedgerStore::new()))
    }

    #[tokio::test]
    async fn test_linked_movement_both_directions() {
        let ledger = ledger();
        let product = ProductId::new();
        let (a, b) = (LocationId::new(), LocationId::new());

        ledger
            .adjust(AdjustmentRequest::new(product, a, 9, MovementType::Receipt))
            .await
            .unwrap();
        let outcome = ledger
            .transfer(TransferRequest::new(product, a, b, 4))
            .await
            .unwrap();

        let from_in = ledger.linked_movement(outcome.transfer_in_id).await.unwrap().unwrap();
        assert_eq!(from_in.id, outcome.transfer_out_id);
        let from_out = ledger.linked_movement(outcome.transfer_out_id).await.unwrap().unwrap();
        assert_eq!(from_out.id, outcome.transfer_in_id);

        let receipt = ledger.movements(product, a).await.unwrap()[0].id;
        assert!(ledger.linked_movement(receipt).await.unwrap().is_none());
        assert!(ledger.linked_movement(MovementId(9999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reconcile_reports_consistency() {
        let ledger = ledger();
        let product = ProductId::new();
        let loc = LocationId::new();

        ledger
            .adjust(AdjustmentRequest::new(product, loc, 8, "receipt"))
            .await
            .unwrap();
        ledger
            .adjust(AdjustmentRequest::new(product, loc, -3, "sale"))
            .await
            .unwrap();

        let rec = ledger.reconcile(product, loc).await.unwrap();
        assert_eq!(rec.balance, Some(5));
        assert_eq!(rec.ledger_sum, 5);
        assert_eq!(rec.movement_count, 2);
        assert!(rec.consistent);
    }

    #[tokio::test]
    async fn test_reconcile_releases_lock() {
        let store =
            MemoryLedgerStore::with_lock_timeout(Some(std::time::Duration::from_millis(100)));
        let ledger = InventoryLedger::new(Arc::new(store));
        let product = ProductId::new();
        let loc = LocationId::new();

        ledger.reconcile(product, loc).await.unwrap();
        ledger
            .adjust(AdjustmentRequest::new(product, loc, 1, "receipt"))
            .await
            .expect("lock must be free after reconcile");
    }
}
