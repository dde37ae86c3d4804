//! Off-path compaction of inert counter rows.
//!
//! Unlocked login records and counters of past windows are never removed by
//! the guards themselves. This service deletes them once they fall behind a
//! retention horizon. Rows holding an active lock are always kept.

use std::sync::Arc;

use chrono::TimeDelta;
use tracing::info;

use vaultgate_core::{AppError, AppResult};

use crate::{Clock, LoginAttemptRepository, WriteWindowRepository};

#[cfg(test)]
mod tests;

/// Rows removed by one compaction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// Login attempt records deleted.
    pub login_attempts_removed: u64,
    /// Write window counters deleted.
    pub write_windows_removed: u64,
}

/// Application service for periodic counter cleanup.
#[derive(Clone)]
pub struct CounterRetentionService {
    login_attempts: Arc<dyn LoginAttemptRepository>,
    write_windows: Arc<dyn WriteWindowRepository>,
    clock: Arc<dyn Clock>,
}

impl CounterRetentionService {
    /// Creates a retention service.
    #[must_use]
    pub fn new(
        login_attempts: Arc<dyn LoginAttemptRepository>,
        write_windows: Arc<dyn WriteWindowRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            login_attempts,
            write_windows,
            clock,
        }
    }

    /// Deletes rows older than `retention`.
    pub async fn compact(&self, retention: TimeDelta) -> AppResult<CompactionReport> {
        if retention <= TimeDelta::zero() {
            return Err(AppError::Validation(
                "counter retention must be greater than zero".to_owned(),
            ));
        }

        let now = self.clock.now();
        let cutoff = now - retention;

        let login_attempts_removed = self.login_attempts.purge_stale(cutoff, now).await?;
        let write_windows_removed = self.write_windows.purge_before(cutoff).await?;

        info!(
            %cutoff,
            login_attempts_removed,
            write_windows_removed,
            "counter compaction finished"
        );

        Ok(CompactionReport {
            login_attempts_removed,
            write_windows_removed,
        })
    }
}
