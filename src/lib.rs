//! Stock Ledger - per-location inventory with an append-only movement ledger
//!
//! # Modules
//!
//! - [`core_types`] - Identifiers (ProductId, LocationId, MovementId, BalanceKey)
//! - [`ledger`] - Balances, movements, adjustments and transfers
//! - [`db`] - PostgreSQL pool and schema
//! - [`gateway`] - HTTP API
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;

// Convenient re-exports at crate root
pub use core_types::{BalanceKey, LocationId, MovementId, ProductId};
pub use ledger::{
    AdjustmentOutcome, AdjustmentRequest, InventoryLedger, LedgerError, LedgerStore,
    MemoryLedgerStore, Movement, MovementType, PgLedgerStore, Reconciliation, StockLevel,
    TransferOutcome, TransferRequest,
};
