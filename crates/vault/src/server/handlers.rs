//! Axum request handlers for all service endpoints.
//!
//! No handler ever returns a plaintext key or an encrypted credential string.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    CredentialListResponse, CredentialResponse, CredentialStatus, ErrorResponse, HealthResponse,
    UpsertCredentialRequest, ValidateResponse,
};
use common::ServiceError;
use tracing::warn;

use super::state::AppState;

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` when a usable passphrase is provisioned.
/// Returns `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let passphrase_configured = state.store.cipher().is_configured();
    let credentials_stored = state.store.len().await;

    let (status_code, status_str) = if passphrase_configured {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        passphrase_configured,
        credentials_stored,
    };
    (status_code, Json(body)).into_response()
}

/// `PUT /v1/users/:user_id/credentials/:provider` — store or replace a key.
pub async fn upsert_credential(
    State(state): State<AppState>,
    Path((user_id, provider)): Path<(String, String)>,
    Json(req): Json<UpsertCredentialRequest>,
) -> Response {
    match state.store.upsert(&user_id, &provider, req.api_key).await {
        Ok(record) => (StatusCode::OK, Json(CredentialResponse::from(&record))).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// `GET /v1/users/:user_id/credentials` — list a user's credentials.
pub async fn list_credentials(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    let credentials = state
        .store
        .list(&user_id)
        .await
        .iter()
        .map(CredentialResponse::from)
        .collect();
    (StatusCode::OK, Json(CredentialListResponse { credentials })).into_response()
}

/// `GET /v1/users/:user_id/credentials/:provider` — describe one credential.
pub async fn get_credential(
    State(state): State<AppState>,
    Path((user_id, provider)): Path<(String, String)>,
) -> Response {
    match state.store.get(&user_id, &provider).await {
        Ok(record) => (StatusCode::OK, Json(CredentialResponse::from(&record))).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// `POST /v1/users/:user_id/credentials/:provider/validate` — health-check a
/// stored key without exposing it.
///
/// An unreadable value is a successful check with `valid: false`.
pub async fn validate_credential(
    State(state): State<AppState>,
    Path((user_id, provider)): Path<(String, String)>,
) -> Response {
    match state.store.check(&user_id, &provider).await {
        Ok(status) => {
            let body = ValidateResponse {
                valid: status == CredentialStatus::Active,
                status,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => error_response(e.into()),
    }
}

/// `DELETE /v1/users/:user_id/credentials/:provider` — remove a credential.
pub async fn delete_credential(
    State(state): State<AppState>,
    Path((user_id, provider)): Path<(String, String)>,
) -> Response {
    match state.store.delete(&user_id, &provider).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!(error = %err, "request failed");
    }
    (status, Json(ErrorResponse::from(&err))).into_response()
}
