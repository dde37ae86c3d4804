//! Fixed-window write throughput budget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vaultgate_core::{AppError, AppResult};

use crate::ClientIdentifier;

/// Per-identifier write allowance over epoch-aligned windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBudgetPolicy {
    limit: u32,
    window_seconds: u32,
}

impl WriteBudgetPolicy {
    /// Writes accepted per window.
    pub const DEFAULT_LIMIT: u32 = 120;
    /// Window length in seconds.
    pub const DEFAULT_WINDOW_SECONDS: u32 = 60;

    /// Creates a validated policy.
    pub fn new(limit: u32, window_seconds: u32) -> AppResult<Self> {
        if limit == 0 {
            return Err(AppError::Validation(
                "write budget limit must be greater than zero".to_owned(),
            ));
        }

        if window_seconds == 0 {
            return Err(AppError::Validation(
                "write budget window must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            limit,
            window_seconds,
        })
    }

    /// Returns the per-window limit.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the window length in seconds.
    #[must_use]
    pub fn window_seconds(&self) -> u32 {
        self.window_seconds
    }

    /// Start of the window containing `now`, in epoch seconds.
    #[must_use]
    pub fn window_start_epoch(&self, now: DateTime<Utc>) -> i64 {
        let epoch = now.timestamp();
        epoch - epoch.rem_euclid(i64::from(self.window_seconds))
    }

    /// Start of the window containing `now`.
    #[must_use]
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        DateTime::from_timestamp(self.window_start_epoch(now), 0).unwrap_or(now)
    }

    /// Whole seconds from `now` until the next window boundary. Always in `1..=window`.
    #[must_use]
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> u64 {
        let window_end = self.window_start_epoch(now) + i64::from(self.window_seconds);
        u64::try_from(window_end - now.timestamp())
            .unwrap_or(1)
            .max(1)
    }

    /// Writes left after `count` accepted writes.
    #[must_use]
    pub fn remaining(&self, count: u32) -> u32 {
        self.limit.saturating_sub(count)
    }
}

impl Default for WriteBudgetPolicy {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            window_seconds: Self::DEFAULT_WINDOW_SECONDS,
        }
    }
}

/// Persisted counter for one identifier in one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteWindowCounter {
    /// Caller the counter belongs to.
    pub identifier: ClientIdentifier,
    /// Aligned start of the window.
    pub window_start: DateTime<Utc>,
    /// Writes accepted in the window.
    pub count: u32,
}

/// Outcome of spending, or inspecting, one unit of write budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBudgetDecision {
    /// Whether the write may proceed.
    pub allowed: bool,
    /// Writes left in the current window.
    pub remaining: u32,
    /// Seconds until the next window, when denied.
    pub retry_after_seconds: Option<u64>,
}

impl WriteBudgetDecision {
    /// Accepted write.
    #[must_use]
    pub fn allowed(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining,
            retry_after_seconds: None,
        }
    }

    /// Rejected write.
    #[must_use]
    pub fn denied(retry_after_seconds: u64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            retry_after_seconds: Some(retry_after_seconds),
        }
    }
}
