//! Shared application state injected into every Axum handler.

use std::time::Duration;

use crate::credentials::CredentialStore;
use crate::crypto::{CredentialCipher, StaticPassphrase};

/// Per-request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all request handlers.
///
/// Cheap to clone: the store is `Arc`-backed.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Encrypted credentials keyed by user and provider.
    pub store: CredentialStore,
    /// Per-request timeout applied by the router.
    pub request_timeout: Duration,
}

impl AppState {
    /// Create a new [`AppState`] around `store`.
    pub fn new(store: CredentialStore, request_timeout: Duration) -> Self {
        Self {
            store,
            request_timeout,
        }
    }
}

impl Default for AppState {
    /// An empty store with no passphrase provisioned, suitable for tests.
    fn default() -> Self {
        Self::new(
            CredentialStore::new(CredentialCipher::new(StaticPassphrase::missing())),
            DEFAULT_REQUEST_TIMEOUT,
        )
    }
}
