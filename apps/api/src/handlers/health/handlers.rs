use super::checks::{check_postgres, check_redis};
use super::*;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store = match &state.store_probe {
        StoreProbe::Postgres(pool) => check_postgres(pool.clone()).await,
        StoreProbe::Redis(client) => check_redis(client.clone()).await,
        StoreProbe::Memory => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
    };

    let ready = store.status == "ok";
    let status = if ready { "ok" } else { "degraded" };
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            ready,
            backend: state.store_probe.backend(),
            store,
        }),
    )
}
