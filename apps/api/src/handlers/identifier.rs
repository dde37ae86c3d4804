use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

use crate::client_identifier::resolve_identifier;
use crate::dto::ClientIdentifierResponse;
use crate::state::AppState;

pub async fn resolve_identifier_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<ClientIdentifierResponse> {
    Json(resolve_identifier(&headers, &state.trusted_client_ip_header).into())
}
