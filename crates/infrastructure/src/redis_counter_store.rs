//! Redis-backed counter store.
//!
//! Conditional updates run as Lua scripts, which Redis executes atomically.
//! Keys carry TTLs, so compaction is left to Redis expiry.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Script};

use vaultgate_application::{CounterSchema, LoginAttemptRepository, WriteWindowRepository};
use vaultgate_core::{AppError, AppResult};
use vaultgate_domain::{
    ClientIdentifier, LoginAttemptRecord, WriteBudgetPolicy, WriteWindowCounter,
};


const INCREMENT_FAILURES_SCRIPT: &str = r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local ttl = tonumber(ARGV[2])

local locked_until = tonumber(redis.call('HGET', key, 'locked_until_ms'))
if locked_until and locked_until <= now_ms then
  redis.call('DEL', key)
end

local attempts = redis.call('HINCRBY', key, 'attempts', 1)
redis.call('HSET', key, 'updated_at_ms', now_ms)
if redis.call('TTL', key) < ttl then
  redis.call('EXPIRE', key, ttl)
end
return attempts
"#;

const LOCK_SCRIPT: &str = r#"
local key = KEYS[1]
if redis.call('EXISTS', key) == 0 then
  return 0
end

local locked_until_ms = tonumber(ARGV[1])
local now_ms = tonumber(ARGV[2])
local ttl = tonumber(ARGV[3])
redis.call('HSET', key, 'locked_until_ms', locked_until_ms, 'updated_at_ms', now_ms)

local lock_ttl = math.ceil((locked_until_ms - now_ms) / 1000) + 1
redis.call('EXPIRE', key, math.max(ttl, lock_ttl))
return 1
"#;

const DELETE_IF_LOCK_EXPIRED_SCRIPT: &str = r#"
local locked_until = tonumber(redis.call('HGET', KEYS[1], 'locked_until_ms'))
if locked_until and locked_until <= tonumber(ARGV[1]) then
  return redis.call('DEL', KEYS[1])
end
return 0
"#;

const INCREMENT_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local limit = tonumber(ARGV[1])
local ttl = tonumber(ARGV[2])

local current = tonumber(redis.call('GET', key) or '0')
if current >= limit then
  return false
end

local count = redis.call('INCR', key)
if count == 1 then
  redis.call('EXPIRE', key, ttl)
end
return count
"#;

/// Redis implementation of the counter store ports.
#[derive(Clone)]
pub struct RedisCounterStore {
    client: redis::Client,
    key_prefix: String,
    record_ttl_seconds: u64,
}

impl RedisCounterStore {
    /// Creates a store with a configured Redis client, key prefix and the
    /// idle lifetime of login attempt records.
    #[must_use]
    pub fn new(
        client: redis::Client,
        key_prefix: impl Into<String>,
        record_ttl_seconds: u64,
    ) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            record_ttl_seconds: record_ttl_seconds.max(1),
        }
    }

    fn login_key(&self, identifier: &ClientIdentifier) -> String {
        format!("{}:login:{identifier}", self.key_prefix)
    }

    fn window_key(&self, identifier: &ClientIdentifier, window_start: DateTime<Utc>) -> String {
        format!(
            "{}:window:{identifier}:{}",
            self.key_prefix,
            window_start.timestamp()
        )
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| redis_error("failed to connect to redis", error))
    }
}

fn redis_error(context: &str, error: redis::RedisError) -> AppError {
    AppError::StoreUnavailable(format!("{context}: {error}"))
}

fn count_from_reply(value: i64, field: &str) -> AppResult<u32> {
    u32::try_from(value)
        .map_err(|error| AppError::Internal(format!("invalid redis {field} '{value}': {error}")))
}

fn timestamp_field(
    fields: &HashMap<String, String>,
    name: &str,
) -> AppResult<Option<DateTime<Utc>>> {
    let Some(raw) = fields.get(name) else {
        return Ok(None);
    };

    let millis = raw
        .parse::<i64>()
        .map_err(|error| AppError::Internal(format!("invalid redis {name} '{raw}': {error}")))?;

    DateTime::from_timestamp_millis(millis)
        .map(Some)
        .ok_or_else(|| AppError::Internal(format!("invalid redis {name} timestamp: {millis}")))
}

#[async_trait]
impl CounterSchema for RedisCounterStore {
    async fn ensure_schema(&self) -> AppResult<()> {
        // Redis is schemaless; confirm reachability instead.
        let mut connection = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut connection)
            .await
            .map_err(|error| redis_error("redis ping failed", error))?;
        Ok(())
    }
}

#[async_trait]
impl LoginAttemptRepository for RedisCounterStore {
    async fn find(&self, identifier: &ClientIdentifier) -> AppResult<Option<LoginAttemptRecord>> {
        let mut connection = self.connection().await?;
        let fields: HashMap<String, String> = connection
            .hgetall(self.login_key(identifier))
            .await
            .map_err(|error| redis_error("failed to load login attempts", error))?;

        if fields.is_empty() {
            return Ok(None);
        }

        let attempts = fields
            .get("attempts")
            .map(|raw| raw.parse::<i64>())
            .transpose()
            .map_err(|error| AppError::Internal(format!("invalid redis attempts: {error}")))?
            .unwrap_or(0);
        let updated_at = timestamp_field(&fields, "updated_at_ms")?.ok_or_else(|| {
            AppError::Internal("redis login record has no updated_at_ms".to_owned())
        })?;

        Ok(Some(LoginAttemptRecord {
            identifier: identifier.clone(),
            attempts: count_from_reply(attempts, "attempts")?,
            locked_until: timestamp_field(&fields, "locked_until_ms")?,
            updated_at,
        }))
    }

    async fn increment_failures(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<u32> {
        let mut connection = self.connection().await?;
        let attempts: i64 = Script::new(INCREMENT_FAILURES_SCRIPT)
            .key(self.login_key(identifier))
            .arg(now.timestamp_millis())
            .arg(self.record_ttl_seconds)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| redis_error("failed to record failed login", error))?;

        count_from_reply(attempts, "attempts")
    }

    async fn lock(
        &self,
        identifier: &ClientIdentifier,
        locked_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut connection = self.connection().await?;
        let updated: i64 = Script::new(LOCK_SCRIPT)
            .key(self.login_key(identifier))
            .arg(locked_until.timestamp_millis())
            .arg(now.timestamp_millis())
            .arg(self.record_ttl_seconds)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| redis_error("failed to lock login identifier", error))?;

        Ok(updated > 0)
    }

    async fn delete_if_lock_expired(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut connection = self.connection().await?;
        let removed: i64 = Script::new(DELETE_IF_LOCK_EXPIRED_SCRIPT)
            .key(self.login_key(identifier))
            .arg(now.timestamp_millis())
            .invoke_async(&mut connection)
            .await
            .map_err(|error| redis_error("failed to reset expired login lock", error))?;

        Ok(removed > 0)
    }

    async fn delete(&self, identifier: &ClientIdentifier) -> AppResult<()> {
        let mut connection = self.connection().await?;
        let _: i64 = connection
            .del(self.login_key(identifier))
            .await
            .map_err(|error| redis_error("failed to clear login attempts", error))?;

        Ok(())
    }

    async fn purge_stale(
        &self,
        _updated_before: DateTime<Utc>,
        _now: DateTime<Utc>,
    ) -> AppResult<u64> {
        // Login records expire automatically via TTL.
        Ok(0)
    }
}

#[async_trait]
impl WriteWindowRepository for RedisCounterStore {
    async fn increment_below_limit(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
        policy: WriteBudgetPolicy,
    ) -> AppResult<Option<u32>> {
        let mut connection = self.connection().await?;
        let count: Option<i64> = Script::new(INCREMENT_WINDOW_SCRIPT)
            .key(self.window_key(identifier, window_start))
            .arg(policy.limit())
            .arg(u64::from(policy.window_seconds()) * 2)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| redis_error("failed to consume write budget", error))?;

        count
            .map(|count| count_from_reply(count, "count"))
            .transpose()
    }

    async fn find(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
    ) -> AppResult<Option<WriteWindowCounter>> {
        let mut connection = self.connection().await?;
        let count: Option<i64> = connection
            .get(self.window_key(identifier, window_start))
            .await
            .map_err(|error| redis_error("failed to load write window", error))?;

        count
            .map(|count| -> AppResult<WriteWindowCounter> {
                Ok(WriteWindowCounter {
                    identifier: identifier.clone(),
                    window_start,
                    count: count_from_reply(count, "count")?,
                })
            })
            .transpose()
    }

    async fn purge_before(&self, _window_start_before: DateTime<Utc>) -> AppResult<u64> {
        // Window keys expire automatically via TTL.
        Ok(0)
    }
}
