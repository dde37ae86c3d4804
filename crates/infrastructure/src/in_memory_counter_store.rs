//! Single-process counter store.
//!
//! Every operation runs under one async mutex, which gives each port method
//! the same all-or-nothing behaviour as a single store statement. State is
//! lost on restart and is not shared between processes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use vaultgate_application::{CounterSchema, LoginAttemptRepository, WriteWindowRepository};
use vaultgate_core::AppResult;
use vaultgate_domain::{
    ClientIdentifier, LoginAttemptRecord, WriteBudgetPolicy, WriteWindowCounter,
};


#[derive(Debug, Default)]
struct CounterState {
    login_attempts: HashMap<ClientIdentifier, LoginAttemptRecord>,
    write_windows: HashMap<(ClientIdentifier, DateTime<Utc>), u32>,
}

/// In-memory implementation of the counter store ports.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    state: Mutex<CounterState>,
}

impl InMemoryCounterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterSchema for InMemoryCounterStore {
    async fn ensure_schema(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl LoginAttemptRepository for InMemoryCounterStore {
    async fn find(&self, identifier: &ClientIdentifier) -> AppResult<Option<LoginAttemptRecord>> {
        let state = self.state.lock().await;
        Ok(state.login_attempts.get(identifier).cloned())
    }

    async fn increment_failures(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<u32> {
        let mut state = self.state.lock().await;
        let record = state
            .login_attempts
            .entry(identifier.clone())
            .or_insert_with(|| LoginAttemptRecord {
                identifier: identifier.clone(),
                attempts: 0,
                locked_until: None,
                updated_at: now,
            });

        if record.locked_until.is_some_and(|until| until <= now) {
            record.attempts = 0;
            record.locked_until = None;
        }

        record.attempts = record.attempts.saturating_add(1);
        record.updated_at = now;

        Ok(record.attempts)
    }

    async fn lock(
        &self,
        identifier: &ClientIdentifier,
        locked_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let Some(record) = state.login_attempts.get_mut(identifier) else {
            return Ok(false);
        };

        record.locked_until = Some(locked_until);
        record.updated_at = now;

        Ok(true)
    }

    async fn delete_if_lock_expired(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let expired = state
            .login_attempts
            .get(identifier)
            .and_then(|record| record.locked_until)
            .is_some_and(|until| until <= now);

        if expired {
            state.login_attempts.remove(identifier);
        }

        Ok(expired)
    }

    async fn delete(&self, identifier: &ClientIdentifier) -> AppResult<()> {
        self.state.lock().await.login_attempts.remove(identifier);
        Ok(())
    }

    async fn purge_stale(
        &self,
        updated_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.login_attempts.len();
        state.login_attempts.retain(|_, record| {
            record.updated_at >= updated_before
                || record.locked_until.is_some_and(|until| until > now)
        });

        Ok(u64::try_from(before - state.login_attempts.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl WriteWindowRepository for InMemoryCounterStore {
    async fn increment_below_limit(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
        policy: WriteBudgetPolicy,
    ) -> AppResult<Option<u32>> {
        let mut state = self.state.lock().await;
        let count = state
            .write_windows
            .entry((identifier.clone(), window_start))
            .or_insert(0);

        if *count >= policy.limit() {
            return Ok(None);
        }

        *count += 1;
        Ok(Some(*count))
    }

    async fn find(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
    ) -> AppResult<Option<WriteWindowCounter>> {
        let state = self.state.lock().await;
        Ok(state
            .write_windows
            .get(&(identifier.clone(), window_start))
            .map(|count| WriteWindowCounter {
                identifier: identifier.clone(),
                window_start,
                count: *count,
            }))
    }

    async fn purge_before(&self, window_start_before: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.write_windows.len();
        state
            .write_windows
            .retain(|(_, window_start), _| *window_start >= window_start_before);

        Ok(u64::try_from(before - state.write_windows.len()).unwrap_or(u64::MAX))
    }
}
