//! Fixed-window write budget.
//!
//! Windows are aligned to epoch multiples of the window length. A caller may
//! therefore spend up to twice the limit across one boundary; that burst is
//! accepted in exchange for a single counter row per window.

use std::sync::Arc;

use tracing::debug;

use vaultgate_core::AppResult;
use vaultgate_domain::{ClientIdentifier, WriteBudgetDecision, WriteBudgetPolicy};

use crate::{Clock, WriteWindowRepository};


/// Application service capping write throughput per identifier.
#[derive(Clone)]
pub struct WriteBudgetService {
    repository: Arc<dyn WriteWindowRepository>,
    clock: Arc<dyn Clock>,
    policy: WriteBudgetPolicy,
}

impl WriteBudgetService {
    /// Creates a write budget limiter.
    #[must_use]
    pub fn new(
        repository: Arc<dyn WriteWindowRepository>,
        clock: Arc<dyn Clock>,
        policy: WriteBudgetPolicy,
    ) -> Self {
        Self {
            repository,
            clock,
            policy,
        }
    }

    /// Returns the active budget policy.
    #[must_use]
    pub fn policy(&self) -> WriteBudgetPolicy {
        self.policy
    }

    /// Spends one write from the identifier's current window.
    pub async fn consume(&self, identifier: &ClientIdentifier) -> AppResult<WriteBudgetDecision> {
        let now = self.clock.now();
        let window_start = self.policy.window_start(now);

        let Some(count) = self
            .repository
            .increment_below_limit(identifier, window_start, self.policy)
            .await?
        else {
            let retry_after_seconds = self.policy.retry_after_seconds(now);
            debug!(
                identifier = %identifier,
                %window_start,
                retry_after_seconds,
                "write budget exhausted"
            );
            return Ok(WriteBudgetDecision::denied(retry_after_seconds));
        };

        Ok(WriteBudgetDecision::allowed(self.policy.remaining(count)))
    }

    /// Reports the identifier's current budget without spending any of it.
    pub async fn status(&self, identifier: &ClientIdentifier) -> AppResult<WriteBudgetDecision> {
        let now = self.clock.now();
        let window_start = self.policy.window_start(now);
        let count = self
            .repository
            .find(identifier, window_start)
            .await?
            .map_or(0, |counter| counter.count);

        if count >= self.policy.limit() {
            return Ok(WriteBudgetDecision::denied(
                self.policy.retry_after_seconds(now),
            ));
        }

        Ok(WriteBudgetDecision::allowed(self.policy.remaining(count)))
    }
}
