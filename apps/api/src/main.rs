//! Vaultgate guard API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod client_identifier;
mod dto;
mod error;
mod handlers;
mod state;

use tracing::info;
use vaultgate_core::AppError;

use crate::api_config::{ApiConfig, init_tracing};
use crate::api_services::{build_app_state, build_counter_store};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let store = build_counter_store(&config.counter_store, config.record_ttl_seconds).await?;
    store.schema.ensure_schema().await?;

    if config.migrate_only {
        info!(backend = store.probe.backend(), "counter schema ready");
        return Ok(());
    }

    let app_state = build_app_state(&config, store);
    info!(
        backend = app_state.store_probe.backend(),
        max_attempts = config.lockout_policy.max_attempts(),
        lockout_seconds = config.lockout_policy.lockout_seconds(),
        write_limit = config.write_budget_policy.limit(),
        window_seconds = config.write_budget_policy.window_seconds(),
        store_failure_mode = ?config.store_failure_mode,
        "guard policies loaded"
    );

    let app = api_router::build_router(app_state);
    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "vaultgate-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
