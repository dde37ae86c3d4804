use axum::extract::{Path, State};
use vaultgate_domain::WriteBudgetDecision;

use crate::dto::WriteBudgetDecisionResponse;
use crate::error::ApiResult;
use crate::state::AppState;

use super::guard_response::{GuardResponse, parse_identifier};

pub async fn consume_write_budget_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<GuardResponse<WriteBudgetDecisionResponse>> {
    let identifier = parse_identifier(identifier)?;
    let limit = state.write_budget_service.policy().limit();

    let decision = state.store_failure_mode.recover(
        state.write_budget_service.consume(&identifier).await,
        "consume_write_budget",
        &identifier,
        || WriteBudgetDecision::allowed(limit),
    )?;

    Ok(GuardResponse {
        allowed: decision.allowed,
        retry_after_seconds: decision.retry_after_seconds,
        body: decision.into(),
    })
}

/// Reports the current window without spending budget.
pub async fn write_budget_status_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<GuardResponse<WriteBudgetDecisionResponse>> {
    let identifier = parse_identifier(identifier)?;
    let decision = state.write_budget_service.status(&identifier).await?;

    Ok(GuardResponse {
        allowed: decision.allowed,
        retry_after_seconds: decision.retry_after_seconds,
        body: decision.into(),
    })
}
