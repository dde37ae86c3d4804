//! Failed-login lockout guard.
//!
//! An identifier is OPEN until it accumulates the policy's failure threshold,
//! then LOCKED until the lock expiry passes. Expiry is observed lazily: the
//! next check or failure for the identifier resets the record.

use std::sync::Arc;

use tracing::{debug, warn};

use vaultgate_core::AppResult;
use vaultgate_domain::{
    ClientIdentifier, LockState, LockoutPolicy, LoginAttemptStatus, LoginFailureOutcome,
    seconds_until,
};

use crate::{Clock, LoginAttemptRepository};

#[cfg(test)]
mod tests;

/// Application service guarding credential checks.
#[derive(Clone)]
pub struct LoginAttemptService {
    repository: Arc<dyn LoginAttemptRepository>,
    clock: Arc<dyn Clock>,
    policy: LockoutPolicy,
}

impl LoginAttemptService {
    /// Creates a login guard.
    #[must_use]
    pub fn new(
        repository: Arc<dyn LoginAttemptRepository>,
        clock: Arc<dyn Clock>,
        policy: LockoutPolicy,
    ) -> Self {
        Self {
            repository,
            clock,
            policy,
        }
    }

    /// Returns the active lockout policy.
    #[must_use]
    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    /// Reports whether the identifier may attempt a login now.
    ///
    /// An elapsed lock is cleared on the way through and the full budget is
    /// reported.
    pub async fn check_attempt(
        &self,
        identifier: &ClientIdentifier,
    ) -> AppResult<LoginAttemptStatus> {
        let now = self.clock.now();
        let Some(record) = self.repository.find(identifier).await? else {
            return Ok(LoginAttemptStatus::open(self.policy.max_attempts()));
        };

        match record.lock_state(now) {
            LockState::Locked { until } => {
                let retry_after_seconds = seconds_until(until, now).max(1);
                debug!(
                    identifier = %identifier,
                    retry_after_seconds,
                    "login attempt rejected while locked"
                );
                Ok(LoginAttemptStatus::locked(retry_after_seconds))
            }
            LockState::Expired => {
                let removed = self
                    .repository
                    .delete_if_lock_expired(identifier, now)
                    .await?;
                debug!(identifier = %identifier, removed, "expired login lock reset");
                Ok(LoginAttemptStatus::open(self.policy.max_attempts()))
            }
            LockState::Unlocked => Ok(LoginAttemptStatus::open(
                self.policy.remaining_attempts(record.attempts),
            )),
        }
    }

    /// Counts one failed login and locks the identifier once the threshold is reached.
    pub async fn record_failure(
        &self,
        identifier: &ClientIdentifier,
    ) -> AppResult<LoginFailureOutcome> {
        let now = self.clock.now();
        let attempts = self.repository.increment_failures(identifier, now).await?;

        if !self.policy.is_exhausted(attempts) {
            debug!(identifier = %identifier, attempts, "failed login recorded");
            return Ok(LoginFailureOutcome::counted());
        }

        let locked = self
            .repository
            .lock(identifier, self.policy.locked_until(now), now)
            .await?;
        if !locked {
            warn!(
                identifier = %identifier,
                attempts,
                "login record cleared before lock was stored"
            );
            return Ok(LoginFailureOutcome::counted());
        }

        warn!(
            identifier = %identifier,
            attempts,
            lockout_seconds = self.policy.lockout_seconds(),
            "login identifier locked"
        );

        Ok(LoginFailureOutcome::locked(u64::from(
            self.policy.lockout_seconds(),
        )))
    }

    /// Forgets all failures for the identifier. Called after a successful login.
    pub async fn clear(&self, identifier: &ClientIdentifier) -> AppResult<()> {
        self.repository.delete(identifier).await?;
        debug!(identifier = %identifier, "login attempts cleared");
        Ok(())
    }
}
