//! Ledger schema
//!
//! Two logical tables: current balances (one row per product x location) and
//! the append-only movement log. Every statement is idempotent so the schema
//! can be applied on each startup.

use anyhow::{Context, Result};
use sqlx::PgPool;

pub const CREATE_BALANCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS stock_balances (
    id          BIGSERIAL PRIMARY KEY,
    product_id  UUID        NOT NULL,
    location_id UUID        NOT NULL,
    quantity    BIGINT      NOT NULL CHECK (quantity >= 0),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (product_id, location_id)
)
"#;

// related_movement_id is a correlation pointer: no ON DELETE action, rows are never deleted
pub const CREATE_MOVEMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS stock_movements (
    id                  BIGSERIAL PRIMARY KEY,
    product_id          UUID        NOT NULL,
    location_id         UUID        NOT NULL,
    movement_type       VARCHAR(64) NOT NULL,
    quantity_delta      BIGINT      NOT NULL,
    related_movement_id BIGINT      NULL REFERENCES stock_movements (id),
    comment             TEXT        NULL,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_MOVEMENTS_PAIR_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_stock_movements_pair
    ON stock_movements (product_id, location_id)
"#;

pub const CREATE_MOVEMENTS_RELATED_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_stock_movements_related
    ON stock_movements (related_movement_id)
"#;

pub const CREATE_BALANCES_QUANTITY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_stock_balances_quantity
    ON stock_balances (quantity)
"#;

/// Initialize the ledger schema
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing ledger schema...");

    let statements = [
        ("stock_balances table", CREATE_BALANCES_TABLE),
        ("stock_movements table", CREATE_MOVEMENTS_TABLE),
        ("movement pair index", CREATE_MOVEMENTS_PAIR_INDEX),
        ("movement related index", CREATE_MOVEMENTS_RELATED_INDEX),
        ("balance quantity index", CREATE_BALANCES_QUANTITY_INDEX),
    ];

    for (what, sql) in statements {
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create {}", what))?;
    }

    tracing::info!("Ledger schema ready");
    Ok(())
}
