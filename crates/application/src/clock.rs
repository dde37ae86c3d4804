use chrono::{DateTime, Utc};

/// Source of the current time for guard decisions.
///
/// Services read the clock once per operation and hand the instant to the
/// store, so one decision never mixes two notions of "now".
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
