pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use state::AppState;

/// Build the gateway router over `state`
pub fn router(state: Arc<AppState>) -> Router {
    let inventory_routes = Router::new()
        .route("/adjust", post(handlers::adjust_stock))
        .route("/transfer", post(handlers::transfer_stock))
        .route("/low-stock", get(handlers::low_stock))
        .route("/balance", get(handlers::get_balance))
        .route("/movements", get(handlers::get_movements))
        .route("/reconcile", get(handlers::reconcile));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .route("/api/v1/openapi.json", get(handlers::openapi_json))
        .nest("/api/v1/inventory", inventory_routes)
        .with_state(state)
}

/// Start HTTP Gateway server
///
/// Serves until `shutdown` resolves, then drains in-flight requests.
pub async fn run_server(
    config: &GatewayConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}, port may already be in use"))?;

    tracing::info!(%addr, "gateway listening");
    tracing::info!("inventory API: /api/v1/inventory/*");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    tracing::info!("gateway stopped");
    Ok(())
}
