use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use axum::http::HeaderName;
use tracing_subscriber::EnvFilter;
use vaultgate_core::{AppError, AppResult};
use vaultgate_domain::{DEFAULT_TRUSTED_CLIENT_IP_HEADER, LockoutPolicy, WriteBudgetPolicy};

/// Which backend holds the durable counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterStoreConfig {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    Redis {
        redis_url: String,
        key_prefix: String,
    },
    Memory,
}

/// How guard endpoints respond when the counter store is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreFailureMode {
    /// Surface the store error, denying the protected operation.
    #[default]
    Closed,
    /// Log and allow the protected operation.
    Open,
}

impl FromStr for StoreFailureMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "closed" => Ok(Self::Closed),
            "open" => Ok(Self::Open),
            other => Err(AppError::Validation(format!(
                "STORE_FAILURE_MODE must be either 'closed' or 'open', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub counter_store: CounterStoreConfig,
    pub api_host: String,
    pub api_port: u16,
    pub trusted_client_ip_header: HeaderName,
    pub lockout_policy: LockoutPolicy,
    pub write_budget_policy: WriteBudgetPolicy,
    pub store_failure_mode: StoreFailureMode,
    pub record_ttl_seconds: u64,
}

impl ApiConfig {
    pub fn load() -> AppResult<Self> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let counter_store = counter_store_config(&lookup)?;

        let api_host = lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or(&lookup, "API_PORT", 3002_u16)?;

        let trusted_header_name = lookup("TRUSTED_CLIENT_IP_HEADER")
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_TRUSTED_CLIENT_IP_HEADER.to_owned());
        let trusted_client_ip_header =
            HeaderName::from_str(&trusted_header_name).map_err(|error| {
                AppError::Validation(format!(
                    "invalid TRUSTED_CLIENT_IP_HEADER '{trusted_header_name}': {error}"
                ))
            })?;

        let lockout_policy = LockoutPolicy::new(
            parse_or(
                &lookup,
                "LOGIN_MAX_ATTEMPTS",
                LockoutPolicy::DEFAULT_MAX_ATTEMPTS,
            )?,
            parse_or(
                &lookup,
                "LOGIN_LOCKOUT_SECONDS",
                LockoutPolicy::DEFAULT_LOCKOUT_SECONDS,
            )?,
        )?;
        let write_budget_policy = WriteBudgetPolicy::new(
            parse_or(
                &lookup,
                "WRITE_BUDGET_LIMIT",
                WriteBudgetPolicy::DEFAULT_LIMIT,
            )?,
            parse_or(
                &lookup,
                "WRITE_BUDGET_WINDOW_SECONDS",
                WriteBudgetPolicy::DEFAULT_WINDOW_SECONDS,
            )?,
        )?;

        let store_failure_mode = lookup("STORE_FAILURE_MODE")
            .map(|value| value.parse::<StoreFailureMode>())
            .transpose()?
            .unwrap_or_default();

        let retention_hours = parse_or(&lookup, "COUNTER_RETENTION_HOURS", 24_u64)?;
        if retention_hours == 0 {
            return Err(AppError::Validation(
                "COUNTER_RETENTION_HOURS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            migrate_only,
            counter_store,
            api_host,
            api_port,
            trusted_client_ip_header,
            lockout_policy,
            write_budget_policy,
            store_failure_mode,
            record_ttl_seconds: retention_hours.saturating_mul(60 * 60),
        })
    }

    pub fn socket_address(&self) -> AppResult<SocketAddr> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

fn counter_store_config(lookup: &impl Fn(&str) -> Option<String>) -> AppResult<CounterStoreConfig> {
    let backend = lookup("COUNTER_STORE").unwrap_or_else(|| "postgres".to_owned());

    match backend.trim().to_ascii_lowercase().as_str() {
        "postgres" => Ok(CounterStoreConfig::Postgres {
            database_url: required_non_empty(lookup, "DATABASE_URL")?,
            max_connections: parse_or(lookup, "DATABASE_MAX_CONNECTIONS", 10_u32)?,
        }),
        "redis" => Ok(CounterStoreConfig::Redis {
            redis_url: required_non_empty(lookup, "REDIS_URL")?,
            key_prefix: lookup("REDIS_KEY_PREFIX")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "vaultgate".to_owned()),
        }),
        "memory" => Ok(CounterStoreConfig::Memory),
        other => Err(AppError::Validation(format!(
            "COUNTER_STORE must be one of 'postgres', 'redis' or 'memory', got '{other}'"
        ))),
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> AppResult<String> {
    let value = lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
