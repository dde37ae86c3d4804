use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(app_state: AppState) -> Router {
    let guard_routes = Router::new()
        .route(
            "/v1/login-attempts/{identifier}",
            get(handlers::login_attempts::check_login_attempt_handler)
                .delete(handlers::login_attempts::clear_login_attempts_handler),
        )
        .route(
            "/v1/login-attempts/{identifier}/failures",
            post(handlers::login_attempts::record_failed_login_handler),
        )
        .route(
            "/v1/write-budget/{identifier}",
            get(handlers::write_budget::write_budget_status_handler)
                .post(handlers::write_budget::consume_write_budget_handler),
        )
        .route(
            "/v1/identifier",
            get(handlers::identifier::resolve_identifier_handler),
        );

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(guard_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
