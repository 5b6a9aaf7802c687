//! HTTP handlers
//!
//! Thin adapters: decode the request, call the ledger, wrap the result in the
//! unified envelope. Every ledger error goes through `ApiError::from`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::state::AppState;
use super::types::{ApiError, ApiResult, BalanceData, BalanceQuery, LowStockQuery, ok};
use crate::ledger::{
    AdjustmentOutcome, AdjustmentRequest, Movement, Reconciliation, StockLevel, TransferOutcome,
    TransferRequest,
};

/// Health check response data
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
    /// Build revision
    #[schema(example = "a1b2c3d")]
    pub version: String,
}

/// Health check endpoint
///
/// - Healthy: 200 OK + {code: 0, data: {timestamp_ms, version}}
/// - Store unreachable: 503 + {code: 5001, msg: "unavailable"}
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    if let Err(e) = state.ledger.health_check().await {
        tracing::error!(error = %e, "health check failed");
        return Err(ApiError::service_unavailable("unavailable"));
    }
    ok(HealthResponse {
        timestamp_ms: Utc::now().timestamp_millis(),
        version: env!("GIT_HASH").to_string(),
    })
}

/// Apply a signed quantity change at one location
#[utoipa::path(
    post,
    path = "/api/v1/inventory/adjust",
    request_body = AdjustmentRequest,
    responses(
        (status = 200, description = "Adjustment committed", body = AdjustmentOutcome),
        (status = 400, description = "Quantity overflow or malformed request"),
        (status = 409, description = "Insufficient stock"),
        (status = 500, description = "Storage failure")
    ),
    tag = "Inventory"
)]
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdjustmentRequest>,
) -> ApiResult<AdjustmentOutcome> {
    let outcome = state.ledger.adjust(req).await?;
    ok(outcome)
}

/// Move stock of one product between two locations
#[utoipa::path(
    post,
    path = "/api/v1/inventory/transfer",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer committed", body = TransferOutcome),
        (status = 400, description = "Same location, non-positive quantity or overflow"),
        (status = 409, description = "Insufficient stock at source"),
        (status = 500, description = "Storage failure")
    ),
    tag = "Inventory"
)]
pub async fn transfer_stock(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<TransferOutcome> {
    let outcome = state.ledger.transfer(req).await?;
    ok(outcome)
}

/// Balances strictly below a threshold
#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    params(LowStockQuery),
    responses(
        (
            status = 200,
            description = "Low-stock balances ordered by location, product",
            body = Vec<StockLevel>
        )
    ),
    tag = "Inventory"
)]
pub async fn low_stock(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LowStockQuery>,
) -> ApiResult<Vec<StockLevel>> {
    let threshold = query
        .threshold
        .unwrap_or(state.default_low_stock_threshold);
    ok(state.ledger.list_below_threshold(threshold).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/balance",
    params(BalanceQuery),
    responses((status = 200, description = "Current balance", body = BalanceData)),
    tag = "Inventory"
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BalanceQuery>,
) -> ApiResult<BalanceData> {
    let quantity = state
        .ledger
        .balance(query.product_id, query.location_id)
        .await?;
    ok(BalanceData {
        product_id: query.product_id,
        location_id: query.location_id,
        quantity,
    })
}

/// Movement history of one balance, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/inventory/movements",
    params(BalanceQuery),
    responses((status = 200, description = "Movement log", body = Vec<Movement>)),
    tag = "Inventory"
)]
pub async fn get_movements(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BalanceQuery>,
) -> ApiResult<Vec<Movement>> {
    ok(state
        .ledger
        .movements(query.product_id, query.location_id)
        .await?)
}

/// Compare a balance with the sum of its movement log
#[utoipa::path(
    get,
    path = "/api/v1/inventory/reconcile",
    params(BalanceQuery),
    responses((status = 200, description = "Reconciliation report", body = Reconciliation)),
    tag = "Inventory"
)]
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BalanceQuery>,
) -> ApiResult<Reconciliation> {
    ok(state
        .ledger
        .reconcile(query.product_id, query.location_id)
        .await?)
}

/// OpenAPI document for this gateway
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    Json(super::openapi::ApiDoc::openapi())
}
