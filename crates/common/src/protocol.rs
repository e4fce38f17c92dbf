//! Request and response types for the credential vault HTTP API.
//!
//! None of these types ever carry a plaintext API key on the way out, nor the
//! encrypted string that protects it. Only [`UpsertCredentialRequest`] carries a
//! raw key, inbound.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Request body for `PUT /v1/users/:user_id/credentials/:provider`.
#[derive(Clone, Deserialize, Serialize)]
pub struct UpsertCredentialRequest {
    /// Raw third-party API key. Encrypted before it is stored; never echoed back.
    pub api_key: String,
}

impl std::fmt::Debug for UpsertCredentialRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpsertCredentialRequest")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Health of a stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// The stored value decrypted successfully the last time it was used.
    Active,
    /// The stored value failed to decrypt; the user must re-enter the key.
    Error,
}

/// Metadata describing one stored credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialResponse {
    /// Stable record identifier; preserved across re-upserts.
    pub id: Uuid,
    /// Owning user.
    pub user_id: String,
    /// Provider name, e.g. `"openai"`.
    pub provider: String,
    /// Last known health of the stored value.
    pub status: CredentialStatus,
    /// When the credential was first stored.
    pub created_at: DateTime<Utc>,
    /// When the credential was last replaced or its status changed.
    pub updated_at: DateTime<Utc>,
}

/// Response body for `GET /v1/users/:user_id/credentials`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialListResponse {
    /// All credentials for the user, ordered by provider name.
    pub credentials: Vec<CredentialResponse>,
}

/// Response body for `POST /v1/users/:user_id/credentials/:provider/validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    /// Whether the stored value still decrypts under the current passphrase.
    pub valid: bool,
    /// The status recorded as a result of the check.
    pub status: CredentialStatus,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether a usable encryption passphrase is currently provisioned.
    pub passphrase_configured: bool,
    /// Number of credentials currently held.
    pub credentials_stored: usize,
}
