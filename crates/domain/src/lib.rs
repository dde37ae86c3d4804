//! Domain entities and invariants for login lockout and write budgets.

#![forbid(unsafe_code)]

mod identifier;
mod login_attempt;
mod write_budget;

pub use identifier::{
    ClientIdentifier, DEFAULT_TRUSTED_CLIENT_IP_HEADER, FORWARDED_FOR_HEADER,
    MAX_IDENTIFIER_LENGTH, UNKNOWN_CLIENT_IDENTIFIER,
};
pub use login_attempt::{
    LockState, LockoutPolicy, LoginAttemptRecord, LoginAttemptStatus, LoginFailureOutcome,
    seconds_until,
};
pub use write_budget::{WriteBudgetDecision, WriteBudgetPolicy, WriteWindowCounter};
