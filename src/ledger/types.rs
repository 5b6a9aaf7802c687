//! Ledger Types
//!
//! Records persisted by the ledger and the request/outcome shapes of its
//! boundary operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::core_types::{BalanceKey, LocationId, MovementId, ProductId};

/// Cause of a quantity change.
///
/// Well-known tags map to their own variant; any other caller-supplied tag is
/// preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MovementType {
    Adjustment,
    Receipt,
    Sale,
    Damage,
    Correction,
    TransferOut,
    TransferIn,
    Other(String),
}

impl MovementType {
    pub fn as_str(&self) -> &str {
        match self {
            MovementType::Adjustment => "adjustment",
            MovementType::Receipt => "receipt",
            MovementType::Sale => "sale",
            MovementType::Damage => "damage",
            MovementType::Correction => "correction",
            MovementType::TransferOut => "transfer_out",
            MovementType::TransferIn => "transfer_in",
            MovementType::Other(tag) => tag,
        }
    }

    /// One half of a transfer. Transfers always write these tags; adjustments
    /// may carry them too.
    pub fn is_transfer(&self) -> bool {
        matches!(self, MovementType::TransferOut | MovementType::TransferIn)
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for MovementType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "adjustment" => MovementType::Adjustment,
            "receipt" => MovementType::Receipt,
            "sale" => MovementType::Sale,
            "damage" => MovementType::Damage,
            "correction" => MovementType::Correction,
            "transfer_out" => MovementType::TransferOut,
            "transfer_in" => MovementType::TransferIn,
            _ => MovementType::Other(tag),
        }
    }
}

impl From<&str> for MovementType {
    fn from(tag: &str) -> Self {
        MovementType::from(tag.to_string())
    }
}

impl From<MovementType> for String {
    fn from(value: MovementType) -> String {
        match value {
            MovementType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Movement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub location_id: LocationId,
    #[sqlx(try_from = "String")]
    #[schema(value_type = String, example = "sale")]
    pub movement_type: MovementType,
    /// Positive = increase, negative = decrease
    pub quantity_delta: i64,
    /// Correlation pointer to the paired movement of a transfer
    pub related_movement_id: Option<MovementId>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    pub fn key(&self) -> BalanceKey {
        BalanceKey::new(self.product_id, self.location_id)
    }
}

/// A movement not yet written. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub key: BalanceKey,
    pub movement_type: MovementType,
    pub quantity_delta: i64,
    pub comment: Option<String>,
    pub related_movement_id: Option<MovementId>,
}

/// Single-location stock change
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdjustmentRequest {
    pub product_id: ProductId,
    pub location_id: LocationId,
    /// Signed change; negative deducts
    #[serde(alias = "quantity")]
    pub quantity_delta: i64,
    #[schema(value_type = String, example = "receipt")]
    pub movement_type: MovementType,
    #[serde(default)]
    pub comment: Option<String>,
}

impl AdjustmentRequest {
    pub fn new(
        product_id: ProductId,
        location_id: LocationId,
        quantity_delta: i64,
        movement_type: impl Into<MovementType>,
    ) -> Self {
        Self {
            product_id,
            location_id,
            quantity_delta,
            movement_type: movement_type.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn key(&self) -> BalanceKey {
        BalanceKey::new(self.product_id, self.location_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdjustmentOutcome {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub new_quantity: i64,
    pub movement_id: MovementId,
}

/// Two-location stock move
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub product_id: ProductId,
    pub source_location_id: LocationId,
    pub dest_location_id: LocationId,
    pub quantity: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

impl TransferRequest {
    pub fn new(
        product_id: ProductId,
        source_location_id: LocationId,
        dest_location_id: LocationId,
        quantity: i64,
    ) -> Self {
        Self {
            product_id,
            source_location_id,
            dest_location_id,
            quantity,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn source_key(&self) -> BalanceKey {
        BalanceKey::new(self.product_id, self.source_location_id)
    }

    pub fn dest_key(&self) -> BalanceKey {
        BalanceKey::new(self.product_id, self.dest_location_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferOutcome {
    pub product_id: ProductId,
    pub source_location_id: LocationId,
    pub dest_location_id: LocationId,
    pub quantity: i64,
    pub new_source_quantity: i64,
    pub new_dest_quantity: i64,
    pub transfer_out_id: MovementId,
    pub transfer_in_id: MovementId,
}

/// Row of the low-stock report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub quantity: i64,
}

/// Stored balance compared with a replay of the movement log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Reconciliation {
    pub product_id: ProductId,
    pub location_id: LocationId,
    /// None when no balance row exists yet
    pub balance: Option<i64>,
    pub ledger_sum: i64,
    pub movement_count: usize,
    pub consistent: bool,
}

impl Reconciliation {
    pub fn from_parts(key: BalanceKey, balance: Option<i64>, movements: &[Movement]) -> Self {
        let ledger_sum = movements.iter().map(|m| m.quantity_delta).sum();
        Self {
            product_id: key.product_id,
            location_id: key.location_id,
            balance,
            ledger_sum,
            movement_count: movements.len(),
            consistent: balance.unwrap_or(0) == ledger_sum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_type_known_tags() {
        assert_eq!(MovementType::from("sale"), MovementType::Sale);
        assert_eq!(MovementType::from("transfer_out"), MovementType::TransferOut);
        assert_eq!(MovementType::TransferIn.as_str(), "transfer_in");
        assert!(MovementType::TransferIn.is_transfer());
        assert!(!MovementType::Receipt.is_transfer());
    }

    #[test]
    fn test_movement_type_keeps_custom_tag() {
        let tag = MovementType::from("cycle_count");
        assert_eq!(tag, MovementType::Other("cycle_count".into()));
        assert_eq!(String::from(tag), "cycle_count");
    }

    #[test]
    fn test_adjustment_request_accepts_quantity_alias() {
        let json = r#"{
            "product_id": "00000000-0000-0000-0000-000000000001",
            "location_id": "00000000-0000-0000-0000-000000000002",
            "quantity": -5,
            "movement_type": "sale"
        }"#;
        let req: AdjustmentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.quantity_delta, -5);
        assert_eq!(req.movement_type, MovementType::Sale);
        assert!(req.comment.is_none());
    }

    #[test]
    fn test_reconciliation_missing_row_counts_as_zero() {
        let key = BalanceKey::new(ProductId::new(), LocationId::new());
        let rec = Reconciliation::from_parts(key, None, &[]);
        assert!(rec.consistent);
        assert_eq!(rec.ledger_sum, 0);
    }
}
