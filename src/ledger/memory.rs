//! In-memory Ledger Store
//!
//! Single-process implementation of [`LedgerStore`] with the same observable
//! semantics as the PostgreSQL store:
//!
//! - one `tokio` mutex per (product, location) key, owned by the unit of work
//!   that locked it until commit, rollback or drop
//! - writes are staged inside the unit and published in one step on commit
//! - movement ids come from a sequence and are not reused after a rollback
//! - a key's mutex is dropped from the lock table once no unit holds or
//!   waits on it, so the table only tracks keys in use
//!
//! Used by the test suite and by the binary when no database is configured.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

use super::error::LedgerError;
use super::store::{LedgerStore, LedgerTx};
use super::types::{Movement, NewMovement, StockLevel};
use crate::core_types::{BalanceKey, MovementId};

#[derive(Default)]
struct Committed {
    balances: BTreeMap<BalanceKey, i64>,
    movements: Vec<Movement>,
}

struct Inner {
    row_locks: DashMap<BalanceKey, Arc<tokio::sync::Mutex<()>>>,
    committed: Mutex<Committed>,
    next_movement_id: AtomicI64,
    lock_timeout: Option<Duration>,
}

impl Inner {
    fn committed(&self) -> Result<MutexGuard<'_, Committed>, LedgerError> {
        self.committed
            .lock()
            .map_err(|_| LedgerError::Storage("memory store state poisoned".into()))
    }

    /// Forget the lock of every key nobody holds or waits on. A later
    /// `lock_balance` creates a fresh one.
    fn prune_row_locks(&self, keys: impl IntoIterator<Item = BalanceKey>) {
        for key in keys {
            self.row_locks
                .remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}

/// In-memory ledger store. Cloning shares the underlying state.
#[derive(Clone)]
pub struct MemoryLedgerStore {
    inner: Arc<Inner>,
}

impl MemoryLedgerStore {
    /// Store whose lock waits are unbounded
    pub fn new() -> Self {
        Self::with_lock_timeout(None)
    }

    pub fn with_lock_timeout(lock_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                row_locks: DashMap::new(),
                committed: Mutex::new(Committed::default()),
                next_movement_id: AtomicI64::new(1),
                lock_timeout,
            }),
        }
    }

    #[cfg(test)]
    fn row_lock_count(&self) -> usize {
        self.inner.row_locks.len()
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        Ok(Box::new(MemoryTx {
            inner: Arc::clone(&self.inner),
            held: HashMap::new(),
            balances: HashMap::new(),
            movements: Vec::new(),
        }))
    }

    async fn balance(&self, key: BalanceKey) -> Result<Option<i64>, LedgerError> {
        Ok(self.inner.committed()?.balances.get(&key).copied())
    }

    async fn below_threshold(&self, threshold: i64) -> Result<Vec<StockLevel>, LedgerError> {
        let committed = self.inner.committed()?;
        let mut levels: Vec<StockLevel> = committed
            .balances
            .iter()
            .filter(|(_, quantity)| **quantity < threshold)
            .map(|(key, quantity)| StockLevel {
                product_id: key.product_id,
                location_id: key.location_id,
                quantity: *quantity,
            })
            .collect();
        levels.sort_by_key(|level| (level.location_id, level.product_id));
        Ok(levels)
    }

    async fn movements(&self, key: BalanceKey) -> Result<Vec<Movement>, LedgerError> {
        let committed = self.inner.committed()?;
        let mut movements: Vec<Movement> = committed
            .movements
            .iter()
            .filter(|m| m.key() == key)
            .cloned()
            .collect();
        // units commit out of id order
        movements.sort_by_key(|m| m.id);
        Ok(movements)
    }

    async fn movement(&self, id: MovementId) -> Result<Option<Movement>, LedgerError> {
        let committed = self.inner.committed()?;
        Ok(committed.movements.iter().find(|m| m.id == id).cloned())
    }

    async fn movements_related_to(&self, id: MovementId) -> Result<Vec<Movement>, LedgerError> {
        let committed = self.inner.committed()?;
        let mut related: Vec<Movement> = committed
            .movements
            .iter()
            .filter(|m| m.related_movement_id == Some(id))
            .cloned()
            .collect();
        related.sort_by_key(|m| m.id);
        Ok(related)
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        self.inner.committed().map(|_| ())
    }
}

/// Unit of work over [`MemoryLedgerStore`]
pub struct MemoryTx {
    inner: Arc<Inner>,
    held: HashMap<BalanceKey, OwnedMutexGuard<()>>,
    balances: HashMap<BalanceKey, i64>,
    movements: Vec<Movement>,
}

impl MemoryTx {
    fn require_held(&self, key: BalanceKey) -> Result<(), LedgerError> {
        if self.held.contains_key(&key) {
            Ok(())
        } else {
            Err(LedgerError::Storage(format!(
                "balance {} written without holding its lock",
                key
            )))
        }
    }

    fn read(&self, key: BalanceKey) -> Result<Option<i64>, LedgerError> {
        if let Some(quantity) = self.balances.get(&key) {
            return Ok(Some(*quantity));
        }
        Ok(self.inner.committed()?.balances.get(&key).copied())
    }

    fn check_non_negative(key: BalanceKey, quantity: i64) -> Result<(), LedgerError> {
        if quantity < 0 {
            return Err(LedgerError::Storage(format!(
                "check constraint violated: balance {} quantity {}",
                key, quantity
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_balance(&mut self, key: BalanceKey) -> Result<Option<i64>, LedgerError> {
        if !self.held.contains_key(&key) {
            let row = Arc::clone(self.inner.row_locks.entry(key).or_default().value());
            let guard = match self.inner.lock_timeout {
                Some(limit) => tokio::time::timeout(limit, row.lock_owned())
                    .await
                    .map_err(|_| {
                        LedgerError::Storage(format!("lock timeout on balance {}", key))
                    })?,
                None => row.lock_owned().await,
            };
            tracing::debug!(%key, "balance lock acquired");
            self.held.insert(key, guard);
        }
        self.read(key)
    }

    async fn insert_balance(&mut self, key: BalanceKey, quantity: i64) -> Result<(), LedgerError> {
        self.require_held(key)?;
        Self::check_non_negative(key, quantity)?;
        if self.read(key)?.is_some() {
            return Err(LedgerError::Storage(format!(
                "unique constraint violated: balance {} already exists",
                key
            )));
        }
        self.balances.insert(key, quantity);
        Ok(())
    }

    async fn update_balance(&mut self, key: BalanceKey, quantity: i64) -> Result<(), LedgerError> {
        self.require_held(key)?;
        Self::check_non_negative(key, quantity)?;
        if self.read(key)?.is_none() {
            return Err(LedgerError::Storage(format!("balance {} does not exist", key)));
        }
        self.balances.insert(key, quantity);
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &NewMovement) -> Result<MovementId, LedgerError> {
        let id = MovementId(self.inner.next_movement_id.fetch_add(1, Ordering::SeqCst));
        self.movements.push(Movement {
            id,
            product_id: movement.key.product_id,
            location_id: movement.key.location_id,
            movement_type: movement.movement_type.clone(),
            quantity_delta: movement.quantity_delta,
            related_movement_id: movement.related_movement_id,
            comment: movement.comment.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn movements(&mut self, key: BalanceKey) -> Result<Vec<Movement>, LedgerError> {
        let mut movements: Vec<Movement> = self
            .inner
            .committed()?
            .movements
            .iter()
            .chain(self.movements.iter())
            .filter(|m| m.key() == key)
            .cloned()
            .collect();
        movements.sort_by_key(|m| m.id);
        Ok(movements)
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let mut this = self;
        let inner = Arc::clone(&this.inner);
        let mut committed = inner.committed()?;
        committed.balances.extend(this.balances.drain());
        committed.movements.append(&mut this.movements);
        drop(committed);

        // locks released by Drop, after the writes are visible
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        tracing::debug!(
            staged_balances = self.balances.len(),
            staged_movements = self.movements.len(),
            "memory unit of work rolled back"
        );
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        let keys: Vec<BalanceKey> = self.held.keys().copied().collect();
        self.held.clear();
        self.inner.prune_row_locks(keys);
    }
}
