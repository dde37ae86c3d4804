//! Application services and ports.

#![forbid(unsafe_code)]

mod clock;
mod counter_ports;
mod counter_retention_service;
mod login_attempt_service;
mod write_budget_service;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, SystemClock};
pub use counter_ports::{CounterSchema, LoginAttemptRepository, WriteWindowRepository};
pub use counter_retention_service::{CompactionReport, CounterRetentionService};
pub use login_attempt_service::LoginAttemptService;
pub use write_budget_service::WriteBudgetService;
