//! [`CredentialStore`]: thread-safe in-memory store of encrypted API keys.

use std::collections::{hash_map::Entry, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::protocol::{CredentialResponse, CredentialStatus};
use common::ServiceError;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::{CipherError, CredentialCipher};

/// Errors produced by the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No credential exists for this user and provider.
    #[error("no {provider} credential stored for user {user_id}")]
    NotFound { user_id: String, provider: String },

    /// A required identifier or the key itself was empty.
    #[error("{0} must not be empty")]
    InvalidInput(&'static str),

    /// The cipher rejected the operation.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// The blocking worker running the cipher panicked or was cancelled.
    #[error("cipher worker failed: {0}")]
    Worker(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            StoreError::InvalidInput(_) => ServiceError::BadRequest(err.to_string()),
            StoreError::Cipher(CipherError::Configuration) => {
                ServiceError::Unavailable(err.to_string())
            }
            StoreError::Cipher(CipherError::InvalidFormat | CipherError::AuthenticationFailed) => {
                ServiceError::CredentialUnreadable(err.to_string())
            }
            StoreError::Cipher(CipherError::PlaintextTooLong) => {
                ServiceError::BadRequest(err.to_string())
            }
            StoreError::Worker(_) => ServiceError::Internal(err.to_string()),
        }
    }
}

/// One stored credential.
#[derive(Clone)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub user_id: String,
    pub provider: String,
    /// The `salt:iv:tag:ciphertext` string. Opaque outside the cipher.
    pub encrypted_key: String,
    pub status: CredentialStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("encrypted_key", &"[REDACTED]")
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl From<&CredentialRecord> for CredentialResponse {
    fn from(r: &CredentialRecord) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id.clone(),
            provider: r.provider.clone(),
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

type RecordKey = (String, String);

fn record_key(user_id: &str, provider: &str) -> RecordKey {
    (user_id.to_owned(), provider.to_owned())
}

/// Thread-safe store keyed by `(user_id, provider)`.
///
/// Wraps an `Arc<RwLock<HashMap<_, _>>>`; clones share the same records. Cipher
/// work runs on Tokio's blocking pool so key derivation never stalls the
/// request executor, and no lock is held while it runs.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    inner: Arc<RwLock<HashMap<RecordKey, CredentialRecord>>>,
    cipher: CredentialCipher,
}

impl CredentialStore {
    /// Create a new, empty [`CredentialStore`] that protects values with `cipher`.
    pub fn new(cipher: CredentialCipher) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            cipher,
        }
    }

    /// The cipher protecting stored values.
    pub fn cipher(&self) -> &CredentialCipher {
        &self.cipher
    }

    /// Number of stored credentials across all users.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Encrypt and store `api_key`, replacing any existing key for this pair.
    ///
    /// A replacement keeps the record's `id` and `created_at` and resets its status
    /// to `active`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] for empty arguments, or
    /// [`StoreError::Cipher`] if encryption fails (e.g. no passphrase).
    pub async fn upsert(
        &self,
        user_id: &str,
        provider: &str,
        api_key: String,
    ) -> Result<CredentialRecord, StoreError> {
        let api_key = Zeroizing::new(api_key);
        ensure_non_empty(user_id, "user_id")?;
        ensure_non_empty(provider, "provider")?;
        ensure_non_empty(&api_key, "api_key")?;

        let encrypted = self.run_cipher(move |c| c.encrypt(&api_key)).await?;
        let now = Utc::now();

        let mut map = self.inner.write().await;
        let record = match map.entry(record_key(user_id, provider)) {
            Entry::Occupied(mut entry) => {
                let r = entry.get_mut();
                r.encrypted_key = encrypted;
                r.status = CredentialStatus::Active;
                r.updated_at = now;
                r.clone()
            }
            Entry::Vacant(entry) => entry
                .insert(CredentialRecord {
                    id: Uuid::new_v4(),
                    user_id: user_id.to_owned(),
                    provider: provider.to_owned(),
                    encrypted_key: encrypted,
                    status: CredentialStatus::Active,
                    created_at: now,
                    updated_at: now,
                })
                .clone(),
        };
        info!(user_id, provider, "credential stored");
        Ok(record)
    }

    /// Look up one credential's record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no such credential.
    pub async fn get(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<CredentialRecord, StoreError> {
        self.inner
            .read()
            .await
            .get(&record_key(user_id, provider))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                user_id: user_id.to_owned(),
                provider: provider.to_owned(),
            })
    }

    /// All credentials belonging to `user_id`, ordered by provider.
    pub async fn list(&self, user_id: &str) -> Vec<CredentialRecord> {
        let mut records: Vec<CredentialRecord> = self
            .inner
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.provider.cmp(&b.provider));
        records
    }

    /// Decrypt a stored key for immediate use.
    ///
    /// The caller must not persist or log the returned value.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if there is no such credential.
    /// - [`StoreError::Cipher`] with `InvalidFormat` or `AuthenticationFailed` if
    ///   the stored value is unreadable; the record is marked `error`.
    /// - [`StoreError::Cipher`] with `Configuration` if no usable passphrase is
    ///   provisioned; the record is left as is.
    pub async fn reveal(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Zeroizing<String>, StoreError> {
        let record = self.get(user_id, provider).await?;
        let encrypted = record.encrypted_key.clone();
        let outcome = self
            .run_cipher(move |c| c.decrypt(&encrypted).map(Zeroizing::new))
            .await;

        match outcome {
            Ok(plaintext) => {
                self.record_status(&record, CredentialStatus::Active).await;
                Ok(plaintext)
            }
            Err(StoreError::Cipher(
                e @ (CipherError::InvalidFormat | CipherError::AuthenticationFailed),
            )) => {
                warn!(user_id, provider, error = %e, "stored credential is unreadable");
                self.record_status(&record, CredentialStatus::Error).await;
                Err(e.into())
            }
            Err(e) => Err(e),
        }
    }

    /// Check that a stored key still decrypts, and record the result.
    ///
    /// Runs [`CredentialCipher::validate`], so no plaintext leaves the cipher.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no such credential, or
    /// [`StoreError::Cipher`] with `Configuration` if no usable passphrase is
    /// provisioned. An unreadable value is reported as
    /// `Ok(CredentialStatus::Error)`, not as an error.
    pub async fn check(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<CredentialStatus, StoreError> {
        let record = self.get(user_id, provider).await?;
        if !self.cipher.is_configured() {
            return Err(CipherError::Configuration.into());
        }

        let encrypted = record.encrypted_key.clone();
        let valid = self.run_cipher(move |c| Ok(c.validate(&encrypted))).await?;

        let status = if valid {
            CredentialStatus::Active
        } else {
            warn!(user_id, provider, "stored credential failed validation");
            CredentialStatus::Error
        };
        self.record_status(&record, status).await;
        Ok(status)
    }

    /// Remove a stored credential.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no such credential.
    pub async fn delete(&self, user_id: &str, provider: &str) -> Result<(), StoreError> {
        let removed = self
            .inner
            .write()
            .await
            .remove(&record_key(user_id, provider));
        match removed {
            Some(_) => {
                info!(user_id, provider, "credential deleted");
                Ok(())
            }
            None => Err(StoreError::NotFound {
                user_id: user_id.to_owned(),
                provider: provider.to_owned(),
            }),
        }
    }

    /// Set the status on the record `observed` was read from, unless the value has
    /// been replaced in the meantime.
    async fn record_status(&self, observed: &CredentialRecord, status: CredentialStatus) {
        let mut map = self.inner.write().await;
        if let Some(current) = map.get_mut(&record_key(&observed.user_id, &observed.provider)) {
            if current.encrypted_key == observed.encrypted_key && current.status != status {
                current.status = status;
                current.updated_at = Utc::now();
            }
        }
    }

    async fn run_cipher<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&CredentialCipher) -> Result<T, CipherError> + Send + 'static,
        T: Send + 'static,
    {
        let cipher = self.cipher.clone();
        let result = tokio::task::spawn_blocking(move || f(&cipher))
            .await
            .map_err(|e| StoreError::Worker(e.to_string()))?;
        Ok(result?)
    }
}

fn ensure_non_empty(value: &str, name: &'static str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::InvalidInput(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::passphrase::{Passphrase, PassphraseSource, StaticPassphrase};
    use std::sync::Mutex;

    const PASSPHRASE: &str = "store-test-passphrase-0123456789abcdef";

    /// Passphrase source an individual test can rotate or remove.
    #[derive(Clone, Default)]
    struct Swappable(Arc<Mutex<Option<String>>>);

    impl Swappable {
        fn set(&self, value: Option<&str>) {
            *self.0.lock().unwrap() = value.map(str::to_owned);
        }
    }

    impl PassphraseSource for Swappable {
        fn passphrase(&self) -> Option<Passphrase> {
            self.0.lock().unwrap().clone().map(Passphrase::new)
        }
    }

    fn store() -> CredentialStore {
        CredentialStore::new(CredentialCipher::new(StaticPassphrase::new(PASSPHRASE)))
    }

    fn swappable_store() -> (CredentialStore, Swappable) {
        let source = Swappable::default();
        source.set(Some(PASSPHRASE));
        let cipher = CredentialCipher::new(source.clone());
        (CredentialStore::new(cipher), source)
    }

    #[tokio::test]
    async fn upsert_then_reveal() {
        let store = store();
        let record = store
            .upsert("u1", "openai", "sk-proj-ABC123!@#".into())
            .await
            .unwrap();
        assert_eq!(record.status, CredentialStatus::Active);
        assert!(!record.encrypted_key.contains("sk-proj"));
        assert_eq!(record.encrypted_key.split(':').count(), 4);

        let plaintext = store.reveal("u1", "openai").await.unwrap();
        assert_eq!(plaintext.as_str(), "sk-proj-ABC123!@#");
    }

    #[tokio::test]
    async fn re_upsert_keeps_identity_and_re_encrypts() {
        let store = store();
        let first = store.upsert("u1", "openai", "sk-old".into()).await.unwrap();
        let second = store.upsert("u1", "openai", "sk-new".into()).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_ne!(first.encrypted_key, second.encrypted_key);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.reveal("u1", "openai").await.unwrap().as_str(), "sk-new");
    }

    #[tokio::test]
    async fn empty_inputs_rejected() {
        let store = store();
        assert!(matches!(
            store.upsert("", "openai", "k".into()).await,
            Err(StoreError::InvalidInput("user_id"))
        ));
        assert!(matches!(
            store.upsert("u1", " ", "k".into()).await,
            Err(StoreError::InvalidInput("provider"))
        ));
        assert!(matches!(
            store.upsert("u1", "openai", "".into()).await,
            Err(StoreError::InvalidInput("api_key"))
        ));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn list_is_per_user_and_sorted() {
        let store = store();
        store.upsert("u1", "openai", "a".into()).await.unwrap();
        store.upsert("u1", "anthropic", "b".into()).await.unwrap();
        store.upsert("u2", "gemini", "c".into()).await.unwrap();

        let providers: Vec<String> = store
            .list("u1")
            .await
            .into_iter()
            .map(|r| r.provider)
            .collect();
        assert_eq!(providers, ["anthropic", "openai"]);
        assert!(store.list("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn missing_credential_is_not_found() {
        let store = store();
        assert!(matches!(
            store.get("u1", "openai").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.reveal("u1", "openai").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete("u1", "openai").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = store();
        store.upsert("u1", "openai", "k".into()).await.unwrap();
        store.delete("u1", "openai").await.unwrap();
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn passphrase_rotation_marks_record_error() {
        let (store, source) = swappable_store();
        store.upsert("u1", "openai", "sk-live".into()).await.unwrap();

        source.set(Some("a-rotated-passphrase-that-is-long-enough"));
        assert!(matches!(
            store.reveal("u1", "openai").await,
            Err(StoreError::Cipher(CipherError::AuthenticationFailed))
        ));
        assert_eq!(
            store.get("u1", "openai").await.unwrap().status,
            CredentialStatus::Error
        );

        // Re-entering the key under the new passphrase recovers the record.
        store.upsert("u1", "openai", "sk-live".into()).await.unwrap();
        assert_eq!(
            store.check("u1", "openai").await.unwrap(),
            CredentialStatus::Active
        );
    }

    #[tokio::test]
    async fn missing_passphrase_leaves_record_untouched() {
        let (store, source) = swappable_store();
        store.upsert("u1", "openai", "sk-live".into()).await.unwrap();

        source.set(None);
        assert!(matches!(
            store.check("u1", "openai").await,
            Err(StoreError::Cipher(CipherError::Configuration))
        ));
        assert_eq!(
            store.get("u1", "openai").await.unwrap().status,
            CredentialStatus::Active
        );
        assert!(matches!(
            store.upsert("u1", "anthropic", "k".into()).await,
            Err(StoreError::Cipher(CipherError::Configuration))
        ));
    }

    #[tokio::test]
    async fn tampered_value_checks_as_error() {
        let store = store();
        store.upsert("u1", "openai", "sk-live".into()).await.unwrap();
        {
            let mut map = store.inner.write().await;
            let record = map.get_mut(&record_key("u1", "openai")).unwrap();
            let mut fields: Vec<String> =
                record.encrypted_key.split(':').map(str::to_owned).collect();
            let tag = &mut fields[2];
            let replacement = if tag.starts_with('0') { "1" } else { "0" };
            tag.replace_range(0..1, replacement);
            record.encrypted_key = fields.join(":");
        }

        assert_eq!(
            store.check("u1", "openai").await.unwrap(),
            CredentialStatus::Error
        );
        assert_eq!(
            store.get("u1", "openai").await.unwrap().status,
            CredentialStatus::Error
        );
    }

    #[tokio::test]
    async fn check_recovers_active_after_status_error() {
        let (store, source) = swappable_store();
        store.upsert("u1", "openai", "sk-live".into()).await.unwrap();

        source.set(Some("a-rotated-passphrase-that-is-long-enough"));
        assert_eq!(
            store.check("u1", "openai").await.unwrap(),
            CredentialStatus::Error
        );

        source.set(Some(PASSPHRASE));
        assert_eq!(
            store.check("u1", "openai").await.unwrap(),
            CredentialStatus::Active
        );
        assert_eq!(
            store.get("u1", "openai").await.unwrap().status,
            CredentialStatus::Active
        );
    }

    #[tokio::test]
    async fn check_on_missing_credential_is_not_found() {
        let store = store();
        assert!(matches!(
            store.check("u1", "openai").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn corrupted_value_checks_as_error() {
        let store = store();
        store.upsert("u1", "openai", "sk-live".into()).await.unwrap();
        store
            .inner
            .write()
            .await
            .get_mut(&record_key("u1", "openai"))
            .unwrap()
            .encrypted_key = "not-a-valid-format".into();

        assert_eq!(
            store.check("u1", "openai").await.unwrap(),
            CredentialStatus::Error
        );
        assert_eq!(
            store.get("u1", "openai").await.unwrap().status,
            CredentialStatus::Error
        );
    }

    #[test]
    fn record_debug_redacts_encrypted_key() {
        let record = CredentialRecord {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            provider: "openai".into(),
            encrypted_key: "deadbeef".into(),
            status: CredentialStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let dbg = format!("{record:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("deadbeef"));
    }

    #[test]
    fn store_errors_map_to_service_errors() {
        let not_found = StoreError::NotFound {
            user_id: "u1".into(),
            provider: "openai".into(),
        };
        assert_eq!(ServiceError::from(not_found).http_status(), 404);
        assert_eq!(
            ServiceError::from(StoreError::InvalidInput("api_key")).http_status(),
            400
        );
        assert_eq!(
            ServiceError::from(StoreError::Cipher(CipherError::Configuration)).http_status(),
            503
        );
        let unreadable = StoreError::Cipher(CipherError::AuthenticationFailed);
        assert_eq!(ServiceError::from(unreadable).http_status(), 422);
    }
}
