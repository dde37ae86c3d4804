use std::sync::Arc;

use vaultgate_application::{Clock, LoginAttemptService, SystemClock, WriteBudgetService};

use crate::api_config::ApiConfig;
use crate::state::AppState;

use super::counter_store::CounterStore;

pub fn build_app_state(config: &ApiConfig, store: CounterStore) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    AppState {
        login_attempt_service: LoginAttemptService::new(
            store.login_attempts,
            clock.clone(),
            config.lockout_policy,
        ),
        write_budget_service: WriteBudgetService::new(
            store.write_windows,
            clock,
            config.write_budget_policy,
        ),
        store_failure_mode: config.store_failure_mode,
        trusted_client_ip_header: config.trusted_client_ip_header.clone(),
        store_probe: store.probe,
    }
}
