//! API boundary types
//!
//! - `ApiResponse<T>`: unified response envelope
//! - `error_codes`: numeric codes carried in the envelope
//! - `ApiError`: handler error, rendered as an envelope with the matching HTTP status
//! - Query parameter structs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::core_types::{LocationId, ProductId};
use crate::ledger::{LedgerError, TransferRejection};

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: payload on success, omitted on error
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    #[schema(example = 0)]
    pub code: i32,
    #[schema(example = "ok")]
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

// ============================================================================
// Error Codes
// ============================================================================

pub mod error_codes {
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_STOCK: i32 = 1002;
    pub const SAME_LOCATION: i32 = 1003;
    pub const INVALID_QUANTITY: i32 = 1004;
    pub const QUANTITY_OVERFLOW: i32 = 1005;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}

// ============================================================================
// Handler Errors
// ============================================================================

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 with the success envelope
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let code = match &e {
            LedgerError::InsufficientStock { .. } => error_codes::INSUFFICIENT_STOCK,
            LedgerError::InvalidTransfer(TransferRejection::SameLocation) => {
                error_codes::SAME_LOCATION
            }
            LedgerError::InvalidTransfer(TransferRejection::NonPositiveQuantity(_)) => {
                error_codes::INVALID_QUANTITY
            }
            LedgerError::QuantityOverflow { .. } => error_codes::QUANTITY_OVERFLOW,
            LedgerError::Storage(_) => error_codes::INTERNAL_ERROR,
        };
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // storage details stay in the logs
        let msg = if e.is_client_error() {
            format!("{}: {}", e.code(), e)
        } else {
            e.code().to_string()
        };
        Self::new(status, code, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.code, self.msg))).into_response()
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Identifies one balance
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BalanceQuery {
    /// Product UUID
    #[param(value_type = String)]
    pub product_id: ProductId,
    /// Location UUID
    #[param(value_type = String)]
    pub location_id: LocationId,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LowStockQuery {
    /// Report balances strictly below this quantity. Defaults to the configured threshold.
    pub threshold: Option<i64>,
}

/// Balance lookup result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceData {
    pub product_id: ProductId,
    pub location_id: LocationId,
    /// None if the pair has never held stock
    pub quantity: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_map_to_status_and_code() {
        let insufficient = ApiError::from(LedgerError::InsufficientStock {
            product_id: ProductId::new(),
            location_id: LocationId::new(),
            available: 1,
            requested: 2,
        });
        assert_eq!(insufficient.status, StatusCode::CONFLICT);
        assert_eq!(insufficient.code, error_codes::INSUFFICIENT_STOCK);
        assert!(insufficient.msg.starts_with("INSUFFICIENT_STOCK"));

        let same = ApiError::from(LedgerError::InvalidTransfer(TransferRejection::SameLocation));
        assert_eq!(same.status, StatusCode::BAD_REQUEST);
        assert_eq!(same.code, error_codes::SAME_LOCATION);

        let storage = ApiError::from(LedgerError::Storage("connection reset".into()));
        assert_eq!(storage.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.msg, "STORAGE_ERROR");
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let json = serde_json::to_value(ApiResponse::<()>::error(1001, "bad")).unwrap();
        assert_eq!(json["code"], 1001);
        assert!(json.get("data").is_none());
    }
}
