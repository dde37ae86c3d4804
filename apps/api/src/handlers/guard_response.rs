use axum::Json;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;
use vaultgate_core::{AppError, AppResult};
use vaultgate_domain::ClientIdentifier;

use crate::api_config::StoreFailureMode;

/// A guard decision rendered as 200, or 429 with `Retry-After` when denied.
#[derive(Debug)]
pub struct GuardResponse<T> {
    pub allowed: bool,
    pub retry_after_seconds: Option<u64>,
    pub body: T,
}

impl<T: Serialize> IntoResponse for GuardResponse<T> {
    fn into_response(self) -> Response {
        if self.allowed {
            return (StatusCode::OK, Json(self.body)).into_response();
        }

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(self.body)).into_response();
        if let Some(retry_after_seconds) = self.retry_after_seconds {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_seconds));
        }
        response
    }
}

impl StoreFailureMode {
    /// Replaces a store outage with `fallback` when failing open.
    pub(super) fn recover<T>(
        self,
        result: AppResult<T>,
        operation: &'static str,
        identifier: &ClientIdentifier,
        fallback: impl FnOnce() -> T,
    ) -> AppResult<T> {
        match result {
            Err(error) if self == Self::Open && error.is_store_unavailable() => {
                warn!(
                    identifier = %identifier,
                    operation,
                    error = %error,
                    "counter store unavailable; failing open"
                );
                Ok(fallback())
            }
            other => other,
        }
    }
}

pub(super) fn parse_identifier(raw: String) -> Result<ClientIdentifier, AppError> {
    ClientIdentifier::new(raw)
}
