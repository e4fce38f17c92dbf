//! Passphrase-derived AES-256-GCM protection of credentials at rest.
//!
//! This module is intentionally free of HTTP and storage dependencies. It turns
//! a plaintext API key into an opaque, authenticated string and back.
//!
//! # Ciphertext format
//!
//! ```text
//! <hex(salt, 64 bytes)>:<hex(iv, 16 bytes)>:<hex(tag, 16 bytes)>:<hex(ciphertext)>
//! ```
//!
//! The field order and encoding are fixed: every value already persisted by a
//! credential store depends on them. A future format change must add an explicit
//! version prefix rather than alter this layout.
//!
//! # Key handling
//!
//! The passphrase is resolved from a [`passphrase::PassphraseSource`] on every call and a
//! fresh key is derived per call from the per-value salt. No key material is
//! cached between calls.

pub mod cipher;
pub mod kdf;
pub mod keygen;
pub mod passphrase;

pub use cipher::{CipherError, CredentialCipher};
pub use keygen::{generate_key, DEFAULT_KEY_LEN};
pub use passphrase::{EnvPassphrase, StaticPassphrase};
