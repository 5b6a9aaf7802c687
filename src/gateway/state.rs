use std::sync::Arc;

use crate::ledger::InventoryLedger;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    /// Ledger service, bound to the configured store
    pub ledger: Arc<InventoryLedger>,
    /// Low-stock threshold applied when the query omits one
    pub default_low_stock_threshold: i64,
}

impl AppState {
    pub fn new(ledger: Arc<InventoryLedger>, default_low_stock_threshold: i64) -> Self {
        Self {
            ledger,
            default_low_stock_threshold,
        }
    }
}
