//! OpenAPI Documentation
//!
//! - OpenAPI JSON: `http://localhost:8080/api/v1/openapi.json`
//! - Offline export: `cargo run --bin export_openapi`

use utoipa::OpenApi;

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::BalanceData;
use crate::ledger::{
    AdjustmentOutcome, AdjustmentRequest, Movement, Reconciliation, StockLevel, TransferOutcome,
    TransferRequest,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stock Ledger API",
        version = "1.0.0",
        description = "Per-location stock balances with an append-only movement ledger.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::adjust_stock,
        crate::gateway::handlers::transfer_stock,
        crate::gateway::handlers::low_stock,
        crate::gateway::handlers::get_balance,
        crate::gateway::handlers::get_movements,
        crate::gateway::handlers::reconcile,
    ),
    components(
        schemas(
            HealthResponse,
            AdjustmentRequest,
            AdjustmentOutcome,
            TransferRequest,
            TransferOutcome,
            StockLevel,
            Movement,
            Reconciliation,
            BalanceData,
        )
    ),
    tags(
        (name = "Inventory", description = "Stock adjustments, transfers and queries"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Stock Ledger API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_inventory_endpoints_registered() {
        let spec = ApiDoc::openapi();
        let paths = spec.paths.paths;
        for path in [
            "/api/v1/health",
            "/api/v1/inventory/adjust",
            "/api/v1/inventory/transfer",
            "/api/v1/inventory/low-stock",
            "/api/v1/inventory/balance",
            "/api/v1/inventory/movements",
            "/api/v1/inventory/reconcile",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("TransferOutcome"));
    }
}
