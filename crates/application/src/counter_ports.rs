//! Ports onto the durable counter store.
//!
//! Every mutating method must be implemented as one atomic conditional
//! statement evaluated by the store. Implementations never read a value,
//! decide in process, and write it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vaultgate_core::AppResult;
use vaultgate_domain::{
    ClientIdentifier, LoginAttemptRecord, WriteBudgetPolicy, WriteWindowCounter,
};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Idempotent creation of the counter tables.
#[async_trait]
pub trait CounterSchema: Send + Sync {
    /// Creates the counter tables if absent.
    ///
    /// Safe to call any number of times from any number of processes.
    async fn ensure_schema(&self) -> AppResult<()>;
}

// ---------------------------------------------------------------------------
// Login attempts
// ---------------------------------------------------------------------------

/// Repository port for per-identifier failed-login records.
#[async_trait]
pub trait LoginAttemptRepository: Send + Sync {
    /// Loads the record for an identifier.
    async fn find(&self, identifier: &ClientIdentifier) -> AppResult<Option<LoginAttemptRecord>>;

    /// Inserts the record at one failure or increments an existing one.
    ///
    /// A record whose lock has elapsed by `now` restarts at one failure with
    /// the lock cleared. Returns the failure count after the write.
    async fn increment_failures(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<u32>;

    /// Sets the lock expiry on an existing record.
    ///
    /// Returns `false` when no record exists, which happens when a clear lands
    /// between the increment and the lock.
    async fn lock(
        &self,
        identifier: &ClientIdentifier,
        locked_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Deletes the record only if it carries a lock that has elapsed by `now`.
    ///
    /// Returns whether a record was removed.
    async fn delete_if_lock_expired(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Deletes the record unconditionally.
    async fn delete(&self, identifier: &ClientIdentifier) -> AppResult<()>;

    /// Removes records last written before `updated_before` that hold no active lock.
    async fn purge_stale(
        &self,
        updated_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;
}

// ---------------------------------------------------------------------------
// Write windows
// ---------------------------------------------------------------------------

/// Repository port for fixed-window write counters.
#[async_trait]
pub trait WriteWindowRepository: Send + Sync {
    /// Inserts the window at one write, or increments it while below the limit.
    ///
    /// Returns the count after the write, or `None` when the window is
    /// already full and nothing was written.
    async fn increment_below_limit(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
        policy: WriteBudgetPolicy,
    ) -> AppResult<Option<u32>>;

    /// Loads the counter for one window.
    async fn find(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
    ) -> AppResult<Option<WriteWindowCounter>>;

    /// Removes counters of windows that started before `window_start_before`.
    async fn purge_before(&self, window_start_before: DateTime<Utc>) -> AppResult<u64>;
}
