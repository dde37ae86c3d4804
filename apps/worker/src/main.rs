//! Vaultgate counter compaction worker.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vaultgate_application::{CounterRetentionService, CounterSchema, SystemClock};
use vaultgate_core::{AppError, AppResult};
use vaultgate_infrastructure::{PostgresCounterStore, RedisCounterStore};

#[derive(Debug, Clone, PartialEq, Eq)]
enum WorkerStoreConfig {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    Redis {
        redis_url: String,
        key_prefix: String,
    },
}

#[derive(Debug, Clone)]
struct WorkerConfig {
    store: WorkerStoreConfig,
    retention_hours: u32,
    interval_seconds: u64,
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let backend = lookup("COUNTER_STORE").unwrap_or_else(|| "postgres".to_owned());
        let store = match backend.trim().to_ascii_lowercase().as_str() {
            "postgres" => WorkerStoreConfig::Postgres {
                database_url: required_env(&lookup, "DATABASE_URL")?,
                max_connections: parse_env_u32(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            "redis" => WorkerStoreConfig::Redis {
                redis_url: required_env(&lookup, "REDIS_URL")?,
                key_prefix: lookup("REDIS_KEY_PREFIX")
                    .filter(|value| !value.trim().is_empty())
                    .unwrap_or_else(|| "vaultgate".to_owned()),
            },
            "memory" => {
                return Err(AppError::Validation(
                    "COUNTER_STORE=memory is process-local; the worker needs 'postgres' or 'redis'"
                        .to_owned(),
                ));
            }
            other => {
                return Err(AppError::Validation(format!(
                    "COUNTER_STORE must be one of 'postgres', 'redis' or 'memory', got '{other}'"
                )));
            }
        };

        let retention_hours = parse_env_u32(&lookup, "COUNTER_RETENTION_HOURS", 24)?;
        let interval_seconds = parse_env_u64(&lookup, "COMPACTION_INTERVAL_SECONDS", 3600)?;

        if retention_hours == 0 {
            return Err(AppError::Validation(
                "COUNTER_RETENTION_HOURS must be greater than zero".to_owned(),
            ));
        }

        if interval_seconds == 0 {
            return Err(AppError::Validation(
                "COMPACTION_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            store,
            retention_hours,
            interval_seconds,
        })
    }

    fn retention(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.retention_hours))
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let retention_service = build_retention_service(&config).await?;

    info!(
        retention_hours = config.retention_hours,
        interval_seconds = config.interval_seconds,
        "vaultgate-worker started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_seconds));
    loop {
        interval.tick().await;

        match retention_service.compact(config.retention()).await {
            Ok(report) => {
                info!(
                    login_attempts_removed = report.login_attempts_removed,
                    write_windows_removed = report.write_windows_removed,
                    "counter compaction finished"
                );
            }
            Err(error) => {
                warn!(error = %error, "counter compaction failed");
            }
        }
    }
}

async fn build_retention_service(config: &WorkerConfig) -> AppResult<CounterRetentionService> {
    let clock = Arc::new(SystemClock);

    match &config.store {
        WorkerStoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let pool = connect_pool(database_url, *max_connections).await?;
            let store = Arc::new(PostgresCounterStore::new(pool));
            store.ensure_schema().await?;
            Ok(CounterRetentionService::new(store.clone(), store, clock))
        }
        WorkerStoreConfig::Redis {
            redis_url,
            key_prefix,
        } => {
            let client = redis::Client::open(redis_url.as_str())
                .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;
            let record_ttl_seconds = u64::from(config.retention_hours) * 60 * 60;
            let store = Arc::new(RedisCounterStore::new(
                client,
                key_prefix.clone(),
                record_ttl_seconds,
            ));
            store.ensure_schema().await?;
            Ok(CounterRetentionService::new(store.clone(), store, clock))
        }
    }
}

async fn connect_pool(database_url: &str, max_connections: u32) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(database_url)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to connect to database: {error}"))
        })
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> AppResult<String> {
    lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u32(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u32,
) -> AppResult<u32> {
    match lookup(name) {
        Some(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

fn parse_env_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> AppResult<u64> {
    match lookup(name) {
        Some(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
