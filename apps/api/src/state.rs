use axum::http::HeaderName;
use vaultgate_application::{LoginAttemptService, WriteBudgetService};

use crate::api_config::StoreFailureMode;

/// Connection handle used by the health check.
#[derive(Clone)]
pub enum StoreProbe {
    Postgres(sqlx::PgPool),
    Redis(redis::Client),
    Memory,
}

impl StoreProbe {
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Redis(_) => "redis",
            Self::Memory => "memory",
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub login_attempt_service: LoginAttemptService,
    pub write_budget_service: WriteBudgetService,
    pub store_failure_mode: StoreFailureMode,
    pub trusted_client_ip_header: HeaderName,
    pub store_probe: StoreProbe,
}
