//! PostgreSQL-backed counter store using the `login_attempts` and
//! `write_windows` tables.
//!
//! Each guard transition is one `INSERT .. ON CONFLICT .. RETURNING` or
//! conditional `DELETE`/`UPDATE`; no explicit transactions are opened.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use vaultgate_application::{CounterSchema, LoginAttemptRepository, WriteWindowRepository};
use vaultgate_core::{AppError, AppResult};
use vaultgate_domain::{
    ClientIdentifier, LoginAttemptRecord, WriteBudgetPolicy, WriteWindowCounter,
};

mod login_attempts;
mod write_windows;


const SCHEMA_STATEMENTS: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS login_attempts (
        identifier TEXT PRIMARY KEY,
        attempts INTEGER NOT NULL CHECK (attempts >= 0),
        locked_until TIMESTAMPTZ NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS write_windows (
        identifier TEXT NOT NULL,
        window_start TIMESTAMPTZ NOT NULL,
        count INTEGER NOT NULL CHECK (count >= 0),
        PRIMARY KEY (identifier, window_start)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS login_attempts_updated_at_idx ON login_attempts (updated_at)",
    "CREATE INDEX IF NOT EXISTS write_windows_window_start_idx ON write_windows (window_start)",
];

// Concurrent `IF NOT EXISTS` DDL from cold processes can still collide on the
// catalog; these codes mean another session created the object first.
const CONCURRENT_DDL_ERROR_CODES: [&str; 3] = ["23505", "42P07", "42710"];

/// PostgreSQL implementation of the counter store ports.
#[derive(Clone)]
pub struct PostgresCounterStore {
    pool: PgPool,
    schema_ready: Arc<AtomicBool>,
}

impl PostgresCounterStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn ensure_schema_impl(&self) -> AppResult<()> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        for statement in SCHEMA_STATEMENTS {
            if let Err(error) = sqlx::query(statement).execute(&self.pool).await {
                if !is_concurrent_ddl_error(&error) {
                    return Err(store_error("failed to create counter schema", error));
                }
            }
        }

        if !self.schema_ready.swap(true, Ordering::AcqRel) {
            info!("counter schema ready");
        }

        Ok(())
    }
}

fn is_concurrent_ddl_error(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .and_then(|database_error| database_error.code())
        .is_some_and(|code| CONCURRENT_DDL_ERROR_CODES.contains(&code.as_ref()))
}

fn store_error(context: &str, error: sqlx::Error) -> AppError {
    AppError::StoreUnavailable(format!("{context}: {error}"))
}

fn count_from_row(value: i32, column: &str) -> AppResult<u32> {
    u32::try_from(value)
        .map_err(|error| AppError::Internal(format!("invalid stored {column} '{value}': {error}")))
}

#[async_trait]
impl CounterSchema for PostgresCounterStore {
    async fn ensure_schema(&self) -> AppResult<()> {
        self.ensure_schema_impl().await
    }
}

#[async_trait]
impl LoginAttemptRepository for PostgresCounterStore {
    async fn find(&self, identifier: &ClientIdentifier) -> AppResult<Option<LoginAttemptRecord>> {
        self.ensure_schema_impl().await?;
        self.find_login_attempt_impl(identifier).await
    }

    async fn increment_failures(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<u32> {
        self.ensure_schema_impl().await?;
        self.increment_failures_impl(identifier, now).await
    }

    async fn lock(
        &self,
        identifier: &ClientIdentifier,
        locked_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.ensure_schema_impl().await?;
        self.lock_impl(identifier, locked_until, now).await
    }

    async fn delete_if_lock_expired(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.ensure_schema_impl().await?;
        self.delete_if_lock_expired_impl(identifier, now).await
    }

    async fn delete(&self, identifier: &ClientIdentifier) -> AppResult<()> {
        self.ensure_schema_impl().await?;
        self.delete_login_attempt_impl(identifier).await
    }

    async fn purge_stale(
        &self,
        updated_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        self.ensure_schema_impl().await?;
        self.purge_stale_login_attempts_impl(updated_before, now)
            .await
    }
}

#[async_trait]
impl WriteWindowRepository for PostgresCounterStore {
    async fn increment_below_limit(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
        policy: WriteBudgetPolicy,
    ) -> AppResult<Option<u32>> {
        self.ensure_schema_impl().await?;
        self.increment_window_impl(identifier, window_start, policy)
            .await
    }

    async fn find(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
    ) -> AppResult<Option<WriteWindowCounter>> {
        self.ensure_schema_impl().await?;
        self.find_window_impl(identifier, window_start).await
    }

    async fn purge_before(&self, window_start_before: DateTime<Utc>) -> AppResult<u64> {
        self.ensure_schema_impl().await?;
        self.purge_windows_impl(window_start_before).await
    }
}
