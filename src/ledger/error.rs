//! Ledger Error Types
//!
//! Two categories matter to callers: domain rejections (the request can never
//! succeed as stated) and storage failures (infrastructure, may succeed later).
//! Either way the unit of work has been rolled back when the error is seen.

use thiserror::Error;

use crate::core_types::{LocationId, ProductId};

/// Why a transfer request was refused before any lock was taken
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferRejection {
    #[error("source and destination location are the same")]
    SameLocation,

    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // === Domain Errors ===
    #[error(
        "Insufficient stock for product {product_id} at location {location_id}: \
         available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        location_id: LocationId,
        available: i64,
        requested: i64,
    },

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(TransferRejection),

    #[error("Quantity overflow for product {product_id} at location {location_id}")]
    QuantityOverflow {
        product_id: ProductId,
        location_id: LocationId,
    },

    // === System Errors ===
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            LedgerError::InvalidTransfer(TransferRejection::SameLocation) => "SAME_LOCATION",
            LedgerError::InvalidTransfer(TransferRejection::NonPositiveQuantity(_)) => {
                "INVALID_QUANTITY"
            }
            LedgerError::QuantityOverflow { .. } => "QUANTITY_OVERFLOW",
            LedgerError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::InvalidTransfer(_) | LedgerError::QuantityOverflow { .. } => 400,
            LedgerError::InsufficientStock { .. } => 409,
            LedgerError::Storage(_) => 500,
        }
    }

    /// Domain rejection caused by the request itself. Never retried by the ledger.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LedgerError::Storage(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}
