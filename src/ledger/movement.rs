//! Movement Logger
//!
//! Append-only writer for the movement log. No domain validation happens
//! here; a failure can only come from the store.

use super::error::LedgerError;
use super::store::LedgerTx;
use super::types::{MovementType, NewMovement};
use crate::core_types::{BalanceKey, MovementId};

pub struct MovementLogger;

impl MovementLogger {
    /// Append one immutable movement inside the unit of work
    pub async fn record(
        tx: &mut dyn LedgerTx,
        key: BalanceKey,
        movement_type: MovementType,
        quantity_delta: i64,
        comment: Option<String>,
        related_movement_id: Option<MovementId>,
    ) -> Result<MovementId, LedgerError> {
        let movement = NewMovement {
            key,
            movement_type,
            quantity_delta,
            comment,
            related_movement_id,
        };
        let id = tx.insert_movement(&movement).await?;
        tracing::debug!(
            movement_id = %id,
            %key,
            movement_type = %movement.movement_type,
            delta = quantity_delta,
            "movement recorded"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{LocationId, ProductId};
    use crate::ledger::memory::MemoryLedgerStore;
    use crate::ledger::store::LedgerStore;

    #[tokio::test]
    async fn test_record_assigns_increasing_ids_and_keeps_fields() {
        let store = MemoryLedgerStore::new();
        let k = BalanceKey::new(ProductId::new(), LocationId::new());

        let mut tx = store.begin().await.unwrap();
        let first = MovementLogger::record(tx.as_mut(), k, MovementType::Receipt, 10, None, None)
            .await
            .unwrap();
        let second = MovementLogger::record(
            tx.as_mut(),
            k,
            MovementType::Other("cycle_count".into()),
            -2,
            Some("recount".into()),
            Some(first),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(second > first);
        let log = store.movements(k).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].movement_type.as_str(), "cycle_count");
        assert_eq!(log[1].quantity_delta, -2);
        assert_eq!(log[1].comment.as_deref(), Some("recount"));
        assert_eq!(log[1].related_movement_id, Some(first));
    }
}
