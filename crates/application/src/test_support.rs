use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use vaultgate_core::{AppError, AppResult};
use vaultgate_domain::{
    ClientIdentifier, LoginAttemptRecord, WriteBudgetPolicy, WriteWindowCounter,
};

use crate::{Clock, LoginAttemptRepository, WriteWindowRepository};

/// Clock that only moves when told to.
pub(crate) struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub(crate) fn at_epoch(seconds: i64) -> Self {
        Self {
            now: Mutex::new(Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()),
        }
    }

    pub(crate) fn advance(&self, delta: TimeDelta) {
        if let Ok(mut now) = self.now.lock() {
            *now += delta;
        }
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }
}

#[derive(Default)]
struct TestCounterState {
    login_attempts: HashMap<String, LoginAttemptRecord>,
    write_windows: HashMap<(String, DateTime<Utc>), u32>,
}

/// Mutex-backed store implementing both counter ports.
#[derive(Default)]
pub(crate) struct TestCounterStore {
    state: Mutex<TestCounterState>,
    clear_before_lock: AtomicBool,
}

impl TestCounterStore {
    fn with_state<T>(&self, operation: impl FnOnce(&mut TestCounterState) -> T) -> AppResult<T> {
        let mut state = self.state.lock().map_err(|error| {
            AppError::Internal(format!("failed to lock test store state: {error}"))
        })?;
        Ok(operation(&mut state))
    }

    pub(crate) fn login_record(&self, identifier: &str) -> Option<LoginAttemptRecord> {
        self.with_state(|state| state.login_attempts.get(identifier).cloned())
            .ok()
            .flatten()
    }

    pub(crate) fn insert_login_record(&self, record: LoginAttemptRecord) {
        let _ = self.with_state(|state| {
            state
                .login_attempts
                .insert(record.identifier.as_str().to_owned(), record)
        });
    }

    pub(crate) fn insert_window(&self, identifier: &str, window_start: DateTime<Utc>, count: u32) {
        let _ = self.with_state(|state| {
            state
                .write_windows
                .insert((identifier.to_owned(), window_start), count)
        });
    }

    /// Makes the next `lock` find its record already deleted.
    pub(crate) fn clear_before_next_lock(&self) {
        self.clear_before_lock.store(true, Ordering::SeqCst);
    }

    pub(crate) fn window_count(&self) -> usize {
        self.with_state(|state| state.write_windows.len())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LoginAttemptRepository for TestCounterStore {
    async fn find(&self, identifier: &ClientIdentifier) -> AppResult<Option<LoginAttemptRecord>> {
        self.with_state(|state| state.login_attempts.get(identifier.as_str()).cloned())
    }

    async fn increment_failures(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<u32> {
        self.with_state(|state| {
            let record = state
                .login_attempts
                .entry(identifier.as_str().to_owned())
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
            record.attempts
        })
    }

    async fn lock(
        &self,
        identifier: &ClientIdentifier,
        locked_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let cleared = self.clear_before_lock.swap(false, Ordering::SeqCst);
        self.with_state(|state| {
            if cleared {
                state.login_attempts.remove(identifier.as_str());
            }
            let Some(record) = state.login_attempts.get_mut(identifier.as_str()) else {
                return false;
            };
            record.locked_until = Some(locked_until);
            record.updated_at = now;
            true
        })
    }

    async fn delete_if_lock_expired(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.with_state(|state| {
            let expired = state
                .login_attempts
                .get(identifier.as_str())
                .and_then(|record| record.locked_until)
                .is_some_and(|until| until <= now);
            if expired {
                state.login_attempts.remove(identifier.as_str());
            }
            expired
        })
    }

    async fn delete(&self, identifier: &ClientIdentifier) -> AppResult<()> {
        self.with_state(|state| {
            state.login_attempts.remove(identifier.as_str());
        })
    }

    async fn purge_stale(
        &self,
        updated_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        self.with_state(|state| {
            let before = state.login_attempts.len();
            state.login_attempts.retain(|_, record| {
                record.updated_at >= updated_before
                    || record.locked_until.is_some_and(|until| until > now)
            });
            (before - state.login_attempts.len()) as u64
        })
    }
}

#[async_trait]
impl WriteWindowRepository for TestCounterStore {
    async fn increment_below_limit(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
        policy: WriteBudgetPolicy,
    ) -> AppResult<Option<u32>> {
        self.with_state(|state| {
            let count = state
                .write_windows
                .entry((identifier.as_str().to_owned(), window_start))
                .or_insert(0);
            if *count >= policy.limit() {
                return None;
            }
            *count += 1;
            Some(*count)
        })
    }

    async fn find(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
    ) -> AppResult<Option<WriteWindowCounter>> {
        self.with_state(|state| {
            state
                .write_windows
                .get(&(identifier.as_str().to_owned(), window_start))
                .map(|count| WriteWindowCounter {
                    identifier: identifier.clone(),
                    window_start,
                    count: *count,
                })
        })
    }

    async fn purge_before(&self, window_start_before: DateTime<Utc>) -> AppResult<u64> {
        self.with_state(|state| {
            let before = state.write_windows.len();
            state
                .write_windows
                .retain(|(_, window_start), _| *window_start >= window_start_before);
            (before - state.write_windows.len()) as u64
        })
    }
}

/// Store whose every call fails as if the network were down.
pub(crate) struct UnavailableStore;

fn unavailable<T>() -> AppResult<T> {
    Err(AppError::StoreUnavailable("connection refused".to_owned()))
}

#[async_trait]
impl LoginAttemptRepository for UnavailableStore {
    async fn find(&self, _identifier: &ClientIdentifier) -> AppResult<Option<LoginAttemptRecord>> {
        unavailable()
    }

    async fn increment_failures(
        &self,
        _identifier: &ClientIdentifier,
        _now: DateTime<Utc>,
    ) -> AppResult<u32> {
        unavailable()
    }

    async fn lock(
        &self,
        _identifier: &ClientIdentifier,
        _locked_until: DateTime<Utc>,
        _now: DateTime<Utc>,
    ) -> AppResult<bool> {
        unavailable()
    }

    async fn delete_if_lock_expired(
        &self,
        _identifier: &ClientIdentifier,
        _now: DateTime<Utc>,
    ) -> AppResult<bool> {
        unavailable()
    }

    async fn delete(&self, _identifier: &ClientIdentifier) -> AppResult<()> {
        unavailable()
    }

    async fn purge_stale(
        &self,
        _updated_before: DateTime<Utc>,
        _now: DateTime<Utc>,
    ) -> AppResult<u64> {
        unavailable()
    }
}

#[async_trait]
impl WriteWindowRepository for UnavailableStore {
    async fn increment_below_limit(
        &self,
        _identifier: &ClientIdentifier,
        _window_start: DateTime<Utc>,
        _policy: WriteBudgetPolicy,
    ) -> AppResult<Option<u32>> {
        unavailable()
    }

    async fn find(
        &self,
        _identifier: &ClientIdentifier,
        _window_start: DateTime<Utc>,
    ) -> AppResult<Option<WriteWindowCounter>> {
        unavailable()
    }

    async fn purge_before(&self, _window_start_before: DateTime<Utc>) -> AppResult<u64> {
        unavailable()
    }
}

pub(crate) fn identifier(value: &str) -> ClientIdentifier {
    ClientIdentifier::new(value).unwrap_or_else(|_| ClientIdentifier::unknown())
}
