//! Stock Ledger server
//!
//! Usage:
//!   cargo run -- --env dev
//!   cargo run -- --env prod --port 9090

use std::sync::Arc;

use anyhow::Context;
use stock_ledger::config::AppConfig;
use stock_ledger::db::{self, Database};
use stock_ledger::gateway::{self, state::AppState};
use stock_ledger::ledger::{InventoryLedger, LedgerStore, MemoryLedgerStore, PgLedgerStore};

// ============================================================
// ARGUMENTS
// ============================================================

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("shutdown signal received");
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = stock_ledger::logging::init_logging(&app_config);

    tracing::info!(env = %env, version = env!("GIT_HASH"), "starting stock ledger");

    let lock_timeout = app_config.ledger.lock_timeout();
    let (store, database): (Arc<dyn LedgerStore>, Option<Database>) =
        match app_config.postgres_url.as_deref() {
            Some(url) => {
                let database = Database::connect(url, &app_config.pool)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                db::schema::init_schema(database.pool()).await?;
                let store =
                    PgLedgerStore::new(database.pool().clone()).with_lock_timeout(lock_timeout);
                (Arc::new(store), Some(database))
            }
            None => {
                tracing::warn!("postgres_url not set, balances live in memory only");
                (
                    Arc::new(MemoryLedgerStore::with_lock_timeout(lock_timeout)),
                    None,
                )
            }
        };

    let ledger = Arc::new(InventoryLedger::new(store));
    let state = Arc::new(AppState::new(
        ledger,
        app_config.ledger.low_stock_threshold,
    ));

    let served = gateway::run_server(&app_config.gateway, state, shutdown_signal()).await;

    if let Some(database) = database {
        database.close().await;
    }
    served
}
