//! Balance Manager
//!
//! The only code path that mutates a balance row.

use super::error::LedgerError;
use super::store::LedgerTx;
use crate::core_types::BalanceKey;

pub struct BalanceManager;

impl BalanceManager {
    /// Lock `key` within the unit of work and apply a signed delta.
    ///
    /// # Errors
    /// - `InsufficientStock` if there is no row and `delta < 0`, or if the
    ///   result would be negative. Nothing is written in either case.
    /// - `QuantityOverflow` if `current + delta` does not fit in an i64
    ///
    /// # Effects
    /// - Creates the row with `quantity = delta` when none exists
    /// - Otherwise persists `current + delta`
    ///
    /// Returns the resulting quantity. It becomes visible to other units only
    /// when the enclosing unit commits.
    pub async fn apply_delta(
        tx: &mut dyn LedgerTx,
        key: BalanceKey,
        delta: i64,
    ) -> Result<i64, LedgerError> {
        match tx.lock_balance(key).await? {
            None if delta < 0 => Err(LedgerError::InsufficientStock {
                product_id: key.product_id,
                location_id: key.location_id,
                available: 0,
                requested: delta.saturating_neg(),
            }),
            None => {
                tx.insert_balance(key, delta).await?;
                Ok(delta)
            }
            Some(current) => {
                let new_quantity =
                    current
                        .checked_add(delta)
                        .ok_or(LedgerError::QuantityOverflow {
                            product_id: key.product_id,
                            location_id: key.location_id,
                        })?;
                if new_quantity < 0 {
                    return Err(LedgerError::InsufficientStock {
                        product_id: key.product_id,
                        location_id: key.location_id,
                        available: current,
                        requested: delta.saturating_neg(),
                    });
                }
                tx.update_balance(key, new_quantity).await?;
                Ok(new_quantity)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{LocationId, ProductId};
    use crate::ledger::memory::MemoryLedgerStore;
    use crate::ledger::store::LedgerStore;

    fn key() -> BalanceKey {
        BalanceKey::new(ProductId::new(), LocationId::new())
    }

    #[tokio::test]
    async fn test_creates_row_on_first_credit() {
        let store = MemoryLedgerStore::new();
        let k = key();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(BalanceManager::apply_delta(tx.as_mut(), k, 12).await.unwrap(), 12);
        tx.commit().await.unwrap();

        assert_eq!(store.balance(k).await.unwrap(), Some(12));
    }

    #[tokio::test]
    async fn test_rejects_deduction_without_row() {
        let store = MemoryLedgerStore::new();
        let k = key();

        let mut tx = store.begin().await.unwrap();
        let err = BalanceManager::apply_delta(tx.as_mut(), k, -1).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                product_id: k.product_id,
                location_id: k.location_id,
                available: 0,
                requested: 1,
            }
        );
        tx.commit().await.unwrap();
        assert_eq!(store.balance(k).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_negative_result_and_keeps_balance() {
        let store = MemoryLedgerStore::new();
        let k = key();

        let mut tx = store.begin().await.unwrap();
        BalanceManager::apply_delta(tx.as_mut(), k, 4).await.unwrap();
        let err = BalanceManager::apply_delta(tx.as_mut(), k, -5).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock {
                available: 4,
                requested: 5,
                ..
            }
        ));
        assert_eq!(tx.lock_balance(k).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_exact_deduction_reaches_zero() {
        let store = MemoryLedgerStore::new();
        let k = key();

        let mut tx = store.begin().await.unwrap();
        BalanceManager::apply_delta(tx.as_mut(), k, 4).await.unwrap();
        assert_eq!(BalanceManager::apply_delta(tx.as_mut(), k, -4).await.unwrap(), 0);
        tx.commit().await.unwrap();
        assert_eq!(store.balance(k).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_overflow_is_reported() {
        let store = MemoryLedgerStore::new();
        let k = key();

        let mut tx = store.begin().await.unwrap();
        BalanceManager::apply_delta(tx.as_mut(), k, i64::MAX).await.unwrap();
        let err = BalanceManager::apply_delta(tx.as_mut(), k, 1).await.unwrap_err();
        assert!(matches!(err, LedgerError::QuantityOverflow { .. }));
    }
}
