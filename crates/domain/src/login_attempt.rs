//! Failed-login counting and temporary lockout rules.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use vaultgate_core::{AppError, AppResult};

use crate::ClientIdentifier;

/// Failure threshold and lock length applied per identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_attempts: u32,
    lockout_seconds: u32,
}

impl LockoutPolicy {
    /// Failures allowed before the identifier is locked.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    /// Length of a lock, in seconds.
    pub const DEFAULT_LOCKOUT_SECONDS: u32 = 2 * 60;

    /// Creates a validated policy.
    pub fn new(max_attempts: u32, lockout_seconds: u32) -> AppResult<Self> {
        if max_attempts == 0 {
            return Err(AppError::Validation(
                "login max attempts must be greater than zero".to_owned(),
            ));
        }

        if lockout_seconds == 0 {
            return Err(AppError::Validation(
                "login lockout duration must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            max_attempts,
            lockout_seconds,
        })
    }

    /// Returns the failure threshold.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the lock length in seconds.
    #[must_use]
    pub fn lockout_seconds(&self) -> u32 {
        self.lockout_seconds
    }

    /// Returns the lock expiry for a lock applied at `now`.
    #[must_use]
    pub fn locked_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + TimeDelta::seconds(i64::from(self.lockout_seconds))
    }

    /// Returns how many failures remain before a lock.
    #[must_use]
    pub fn remaining_attempts(&self, attempts: u32) -> u32 {
        self.max_attempts.saturating_sub(attempts)
    }

    /// Returns whether `attempts` failures warrant a lock.
    #[must_use]
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            lockout_seconds: Self::DEFAULT_LOCKOUT_SECONDS,
        }
    }
}

/// Persisted failure counter for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttemptRecord {
    /// Caller the record belongs to.
    pub identifier: ClientIdentifier,
    /// Failures recorded since the last reset.
    pub attempts: u32,
    /// Lock expiry; may already lie in the past until the record is next touched.
    pub locked_until: Option<DateTime<Utc>>,
    /// Time of the last write.
    pub updated_at: DateTime<Utc>,
}

/// Lock state of a record observed at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No lock was ever applied since the last reset.
    Unlocked,
    /// Lock still in force.
    Locked {
        /// Expiry of the lock.
        until: DateTime<Utc>,
    },
    /// A lock was applied and has since elapsed.
    Expired,
}

impl LoginAttemptRecord {
    /// Evaluates the lock at `now`.
    #[must_use]
    pub fn lock_state(&self, now: DateTime<Utc>) -> LockState {
        match self.locked_until {
            None => LockState::Unlocked,
            Some(until) if until > now => LockState::Locked { until },
            Some(_) => LockState::Expired,
        }
    }
}

/// Answer to "may this caller attempt a login now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttemptStatus {
    /// Whether credentials may be checked.
    pub allowed: bool,
    /// Failures left before a lock.
    pub remaining_attempts: u32,
    /// Seconds until the lock lifts, when locked.
    pub retry_after_seconds: Option<u64>,
}

impl LoginAttemptStatus {
    /// Open state with the given remaining budget.
    #[must_use]
    pub fn open(remaining_attempts: u32) -> Self {
        Self {
            allowed: true,
            remaining_attempts,
            retry_after_seconds: None,
        }
    }

    /// Locked state.
    #[must_use]
    pub fn locked(retry_after_seconds: u64) -> Self {
        Self {
            allowed: false,
            remaining_attempts: 0,
            retry_after_seconds: Some(retry_after_seconds),
        }
    }
}

/// Result of recording one failed login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginFailureOutcome {
    /// Whether this failure locked the identifier.
    pub locked: bool,
    /// Lock length in seconds, when locked.
    pub retry_after_seconds: Option<u64>,
}

impl LoginFailureOutcome {
    /// Failure counted without a lock.
    #[must_use]
    pub fn counted() -> Self {
        Self {
            locked: false,
            retry_after_seconds: None,
        }
    }

    /// Failure that applied a lock.
    #[must_use]
    pub fn locked(retry_after_seconds: u64) -> Self {
        Self {
            locked: true,
            retry_after_seconds: Some(retry_after_seconds),
        }
    }
}

/// Whole seconds from `now` until `until`, rounded up. Zero when already past.
#[must_use]
pub fn seconds_until(until: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (until - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }

    u64::try_from(millis)
        .map(|millis| millis.div_ceil(1000))
        .unwrap_or(0)
}
