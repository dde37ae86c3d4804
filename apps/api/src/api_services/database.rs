use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use vaultgate_core::AppError;

pub(super) async fn connect_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, AppError> {
    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(database_url)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to connect to database: {error}"))
        })
}
