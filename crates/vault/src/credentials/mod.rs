//! Per-user third-party API keys, held only in encrypted form.
//!
//! # Lifecycle
//!
//! 1. [`CredentialStore::upsert`] encrypts the raw key with the
//!    [`CredentialCipher`](crate::crypto::CredentialCipher) and keeps only the
//!    resulting string. Replacing a key re-encrypts with a fresh salt and IV.
//! 2. [`CredentialStore::reveal`] decrypts for the duration of one outbound
//!    provider call. The plaintext comes back in a zeroizing buffer.
//! 3. [`CredentialStore::check`] is the health check: it runs the cipher's
//!    `validate`, which never hands out the plaintext, and records the outcome
//!    on the record.
//! 4. [`CredentialStore::delete`] drops the record and its encrypted value.
//!
//! # Security invariants
//!
//! - Plaintext keys are **never** stored, logged, or included in traces.
//! - A decrypt failure caused by the stored value (format or tag) marks the record
//!   `error`; the user has to re-enter the key. A missing passphrase is an
//!   operator problem and leaves records untouched.
//! - Rotating the passphrase makes every stored value unreadable. There is no
//!   migration path; users re-enter their keys.

pub mod store;

pub use store::CredentialStore;
