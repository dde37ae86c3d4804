use vaultgate_domain::{
    ClientIdentifier, LoginAttemptStatus, LoginFailureOutcome, WriteBudgetDecision,
};

use super::types::{
    ClientIdentifierResponse, LoginAttemptStatusResponse, LoginFailureResponse,
    WriteBudgetDecisionResponse,
};

impl From<LoginAttemptStatus> for LoginAttemptStatusResponse {
    fn from(value: LoginAttemptStatus) -> Self {
        Self {
            allowed: value.allowed,
            remaining_attempts: value.remaining_attempts,
            retry_after_seconds: value.retry_after_seconds,
        }
    }
}

impl From<LoginFailureOutcome> for LoginFailureResponse {
    fn from(value: LoginFailureOutcome) -> Self {
        Self {
            locked: value.locked,
            retry_after_seconds: value.retry_after_seconds,
        }
    }
}

impl From<WriteBudgetDecision> for WriteBudgetDecisionResponse {
    fn from(value: WriteBudgetDecision) -> Self {
        Self {
            allowed: value.allowed,
            remaining: value.remaining,
            retry_after_seconds: value.retry_after_seconds,
        }
    }
}

impl From<ClientIdentifier> for ClientIdentifierResponse {
    fn from(value: ClientIdentifier) -> Self {
        Self {
            is_unknown: value.is_unknown(),
            identifier: value.into(),
        }
    }
}
