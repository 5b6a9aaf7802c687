//! Inventory Ledger & Transfer Engine
//!
//! Authoritative stock balances per (product, location) plus an append-only
//! log of every quantity change.
//!
//! # Architecture
//!
//! ```text
//! InventoryLedger ──begin──▶ LedgerStore ──▶ LedgerTx (unit of work)
//!      │                                        ▲
//!      ├── adjust ───▶ BalanceManager ──────────┤
//!      │               MovementLogger ──────────┤
//!      └── transfer ─▶ TransferOrchestrator ────┘
//!                        (2x BalanceManager, 2x MovementLogger)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Non-negative**: no committed balance is ever below zero
//! 2. **Reconciliation**: a balance equals the sum of its movement deltas
//! 3. **All-or-nothing**: a failed operation leaves no balance or movement behind
//! 4. **Lock Order**: multi-row units lock in ascending location id

pub mod adjustment;
pub mod balance;
pub mod error;
pub mod memory;
pub mod movement;
pub mod postgres;
pub mod service;
pub mod store;
pub mod transfer;
pub mod types;


// Re-exports for convenience
pub use balance::BalanceManager;
pub use error::{LedgerError, TransferRejection};
pub use memory::MemoryLedgerStore;
pub use movement::MovementLogger;
pub use postgres::PgLedgerStore;
pub use service::InventoryLedger;
pub use store::{LedgerStore, LedgerTx};
pub use transfer::TransferOrchestrator;
pub use types::{
    AdjustmentOutcome, AdjustmentRequest, Movement, MovementType, NewMovement, Reconciliation,
    StockLevel, TransferOutcome, TransferRequest,
};
