use serde::Serialize;
use ts_rs::TS;

/// Whether a caller may attempt a login now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/login-attempt-status-response.ts"
)]
pub struct LoginAttemptStatusResponse {
    pub allowed: bool,
    pub remaining_attempts: u32,
    pub retry_after_seconds: Option<u64>,
}

/// Result of recording one failed login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/login-failure-response.ts"
)]
pub struct LoginFailureResponse {
    pub locked: bool,
    pub retry_after_seconds: Option<u64>,
}

/// Result of consuming one unit of write budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/write-budget-decision-response.ts"
)]
pub struct WriteBudgetDecisionResponse {
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after_seconds: Option<u64>,
}

/// Identifier resolved from the request headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/client-identifier-response.ts"
)]
pub struct ClientIdentifierResponse {
    pub identifier: String,
    pub is_unknown: bool,
}
