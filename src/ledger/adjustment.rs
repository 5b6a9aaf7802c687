//! Adjustment Operation
//!
//! Single-location stock change: one balance mutation and one movement,
//! written in the caller's unit of work.

use super::balance::BalanceManager;
use super::error::LedgerError;
use super::movement::MovementLogger;
use super::store::LedgerTx;
use super::types::{AdjustmentOutcome, AdjustmentRequest};

/// Apply `req` inside `tx`. The movement carries the requested delta, also
/// when the balance row is created by this call.
pub async fn adjust(
    tx: &mut dyn LedgerTx,
    req: AdjustmentRequest,
) -> Result<AdjustmentOutcome, LedgerError> {
    let key = req.key();
    let new_quantity = BalanceManager::apply_delta(tx, key, req.quantity_delta).await?;
    let movement_id = MovementLogger::record(
        tx,
        key,
        req.movement_type,
        req.quantity_delta,
        req.comment,
        None,
    )
    .await?;

    Ok(AdjustmentOutcome {
        product_id: key.product_id,
        location_id: key.location_id,
        new_quantity,
        movement_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{LocationId, ProductId};
    use crate::ledger::memory::MemoryLedgerStore;
    use crate::ledger::store::LedgerStore;
    use crate::ledger::types::MovementType;

    #[tokio::test]
    async fn test_adjust_writes_balance_and_movement() {
        let store = MemoryLedgerStore::new();
        let req = AdjustmentRequest::new(ProductId::new(), LocationId::new(), 20, "receipt")
            .with_comment("PO-1182");
        let key = req.key();

        let mut tx = store.begin().await.unwrap();
        let outcome = adjust(tx.as_mut(), req).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(outcome.new_quantity, 20);
        let log = store.movements(key).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].id, outcome.movement_id);
        assert_eq!(log[0].movement_type, MovementType::Receipt);
        assert_eq!(log[0].quantity_delta, 20);
        assert_eq!(log[0].related_movement_id, None);
    }

    #[tokio::test]
    async fn test_rejected_adjust_logs_nothing() {
        let store = MemoryLedgerStore::new();
        let req = AdjustmentRequest::new(ProductId::new(), LocationId::new(), -3, "damage");
        let key = req.key();

        let mut tx = store.begin().await.unwrap();
        let err = adjust(tx.as_mut(), req).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { .. }));
        tx.commit().await.unwrap();

        assert!(store.movements(key).await.unwrap().is_empty());
    }
}
