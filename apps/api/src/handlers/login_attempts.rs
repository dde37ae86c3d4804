use axum::extract::{Path, State};
use axum::http::StatusCode;
use vaultgate_domain::{LoginAttemptStatus, LoginFailureOutcome};

use crate::dto::{LoginAttemptStatusResponse, LoginFailureResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::guard_response::{GuardResponse, parse_identifier};

pub async fn check_login_attempt_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<GuardResponse<LoginAttemptStatusResponse>> {
    let identifier = parse_identifier(identifier)?;
    let max_attempts = state.login_attempt_service.policy().max_attempts();

    let status = state.store_failure_mode.recover(
        state.login_attempt_service.check_attempt(&identifier).await,
        "check_login_attempt",
        &identifier,
        || LoginAttemptStatus::open(max_attempts),
    )?;

    Ok(GuardResponse {
        allowed: status.allowed,
        retry_after_seconds: status.retry_after_seconds,
        body: status.into(),
    })
}

/// Records a failure. The call that trips the lock answers 429.
pub async fn record_failed_login_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<GuardResponse<LoginFailureResponse>> {
    let identifier = parse_identifier(identifier)?;

    let outcome = state.store_failure_mode.recover(
        state
            .login_attempt_service
            .record_failure(&identifier)
            .await,
        "record_failed_login",
        &identifier,
        LoginFailureOutcome::counted,
    )?;

    Ok(GuardResponse {
        allowed: !outcome.locked,
        retry_after_seconds: outcome.retry_after_seconds,
        body: outcome.into(),
    })
}

pub async fn clear_login_attempts_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<StatusCode> {
    let identifier = parse_identifier(identifier)?;
    state.login_attempt_service.clear(&identifier).await?;

    Ok(StatusCode::NO_CONTENT)
}
