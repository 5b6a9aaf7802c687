//! Ledger Store
//!
//! The transactional storage seam. A [`LedgerStore`] hands out units of work
//! ([`LedgerTx`]); everything written through a unit becomes visible at once on
//! [`LedgerTx::commit`] or not at all.
//!
//! # Locking contract
//!
//! - [`LedgerTx::lock_balance`] takes an exclusive lock on the logical
//!   (product, location) key, whether or not a row exists yet, and holds it
//!   until the unit commits, rolls back or is dropped.
//! - Locking a key the unit already holds returns immediately.
//! - A lock wait may be bounded by the store; expiry is reported as
//!   [`LedgerError::Storage`].
//! - Dropping a unit without committing rolls it back.

use async_trait::async_trait;

use super::error::LedgerError;
use super::types::{Movement, NewMovement, StockLevel};
use crate::core_types::{BalanceKey, MovementId};

/// One atomic unit of work
#[async_trait]
pub trait LedgerTx: Send {
    /// Lock the balance key and read its current quantity (None = no row)
    async fn lock_balance(&mut self, key: BalanceKey) -> Result<Option<i64>, LedgerError>;

    /// Create the balance row. The key must be locked and must not have a row.
    async fn insert_balance(&mut self, key: BalanceKey, quantity: i64) -> Result<(), LedgerError>;

    /// Overwrite the quantity of an existing, locked balance row
    async fn update_balance(&mut self, key: BalanceKey, quantity: i64) -> Result<(), LedgerError>;

    /// Append one movement and return its assigned id
    async fn insert_movement(&mut self, movement: &NewMovement) -> Result<MovementId, LedgerError>;

    /// Movements of one balance as seen by this unit, ordered by id.
    /// Reads through the unit's own connection.
    async fn movements(&mut self, key: BalanceKey) -> Result<Vec<Movement>, LedgerError>;

    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}

/// Durable balance and movement storage
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Store name for logging
    fn name(&self) -> &'static str;

    /// Open a new unit of work
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError>;

    /// Committed quantity of one balance, without locking
    async fn balance(&self, key: BalanceKey) -> Result<Option<i64>, LedgerError>;

    /// Every balance with `quantity < threshold`, ordered by location then product
    async fn below_threshold(&self, threshold: i64) -> Result<Vec<StockLevel>, LedgerError>;

    /// Audit trail of one balance, ordered by movement id
    async fn movements(&self, key: BalanceKey) -> Result<Vec<Movement>, LedgerError>;

    async fn movement(&self, id: MovementId) -> Result<Option<Movement>, LedgerError>;

    /// Movements whose correlation pointer references `id`
    async fn movements_related_to(&self, id: MovementId) -> Result<Vec<Movement>, LedgerError>;

    async fn health_check(&self) -> Result<(), LedgerError>;
}
