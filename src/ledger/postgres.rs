//! PostgreSQL Ledger Store
//!
//! Each unit of work is one database transaction. A balance key is locked with
//! a transaction-scoped advisory lock derived from (product, location) in the
//! database, so the lock exists even before the balance row does, followed by
//! `SELECT ... FOR UPDATE` on the row itself. Both are released by COMMIT or
//! ROLLBACK; sqlx rolls back a transaction that is dropped unfinished.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashSet;
use std::time::Duration;

use super::error::LedgerError;
use super::store::{LedgerStore, LedgerTx};
use super::types::{Movement, NewMovement, StockLevel};
use crate::core_types::{BalanceKey, MovementId};

const LOCK_KEY_SQL: &str =
    "SELECT pg_advisory_xact_lock(hashtextextended($1::text || '/' || $2::text, 0))";

const SELECT_BALANCE_FOR_UPDATE_SQL: &str =
    "SELECT quantity FROM stock_balances WHERE product_id = $1 AND location_id = $2 FOR UPDATE";

const MOVEMENT_COLUMNS: &str = "id, product_id, location_id, movement_type, quantity_delta, \
                                related_movement_id, comment, created_at";

/// PostgreSQL-backed ledger store
pub struct PgLedgerStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Bound every lock wait inside a unit of work
    pub fn with_lock_timeout(mut self, lock_timeout: Option<Duration>) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        let mut tx = self.pool.begin().await?;

        if let Some(limit) = self.lock_timeout {
            // SET does not take bind parameters; the value is an integer we format ourselves
            let stmt = format!("SET LOCAL lock_timeout = '{}ms'", limit.as_millis());
            sqlx::query(&stmt).execute(&mut *tx).await?;
        }

        Ok(Box::new(PgLedgerTx {
            tx,
            locked: HashSet::new(),
        }))
    }

    async fn balance(&self, key: BalanceKey) -> Result<Option<i64>, LedgerError> {
        let quantity = sqlx::query_scalar::<_, i64>(
            "SELECT quantity FROM stock_balances WHERE product_id = $1 AND location_id = $2",
        )
        .bind(key.product_id)
        .bind(key.location_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(quantity)
    }

    async fn below_threshold(&self, threshold: i64) -> Result<Vec<StockLevel>, LedgerError> {
        let rows = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT product_id, location_id, quantity
            FROM stock_balances
            WHERE quantity < $1
            ORDER BY location_id, product_id
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn movements(&self, key: BalanceKey) -> Result<Vec<Movement>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM stock_movements WHERE product_id = $1 AND location_id = $2 ORDER BY id",
            MOVEMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Movement>(&sql)
            .bind(key.product_id)
            .bind(key.location_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn movement(&self, id: MovementId) -> Result<Option<Movement>, LedgerError> {
        let sql = format!("SELECT {} FROM stock_movements WHERE id = $1", MOVEMENT_COLUMNS);
        let row = sqlx::query_as::<_, Movement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn movements_related_to(&self, id: MovementId) -> Result<Vec<Movement>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM stock_movements WHERE related_movement_id = $1 ORDER BY id",
            MOVEMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Movement>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Unit of work over [`PgLedgerStore`]
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
    locked: HashSet<BalanceKey>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_balance(&mut self, key: BalanceKey) -> Result<Option<i64>, LedgerError> {
        if self.locked.insert(key) {
            sqlx::query(LOCK_KEY_SQL)
                .bind(key.product_id)
                .bind(key.location_id)
                .execute(&mut *self.tx)
                .await?;
            tracing::debug!(%key, "balance lock acquired");
        }

        let quantity = sqlx::query_scalar::<_, i64>(SELECT_BALANCE_FOR_UPDATE_SQL)
            .bind(key.product_id)
            .bind(key.location_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(quantity)
    }

    async fn insert_balance(&mut self, key: BalanceKey, quantity: i64) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO stock_balances (product_id, location_id, quantity) VALUES ($1, $2, $3)",
        )
        .bind(key.product_id)
        .bind(key.location_id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_balance(&mut self, key: BalanceKey, quantity: i64) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r#"
            UPDATE stock_balances SET quantity = $1, updated_at = NOW()
            WHERE product_id = $2 AND location_id = $3
            "#,
        )
        .bind(quantity)
        .bind(key.product_id)
        .bind(key.location_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::Storage(format!("balance {} does not exist", key)));
        }
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &NewMovement) -> Result<MovementId, LedgerError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO stock_movements
                (product_id, location_id, movement_type, quantity_delta,
                 related_movement_id, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(movement.key.product_id)
        .bind(movement.key.location_id)
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity_delta)
        .bind(movement.related_movement_id)
        .bind(movement.comment.as_deref())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(MovementId(id))
    }

    async fn movements(&mut self, key: BalanceKey) -> Result<Vec<Movement>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM stock_movements WHERE product_id = $1 AND location_id = $2 ORDER BY id",
            MOVEMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Movement>(&sql)
            .bind(key.product_id)
            .bind(key.location_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
