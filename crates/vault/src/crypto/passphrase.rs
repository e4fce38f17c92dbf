//! The process-wide encryption passphrase and where it comes from.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum passphrase length, in characters, accepted by the cipher.
pub const MIN_PASSPHRASE_LEN: usize = 32;

/// Owned passphrase text.
///
/// Zeroed on drop. Never printed, not even in debug builds.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns `true` if the passphrase has at least [`MIN_PASSPHRASE_LEN`] characters.
    ///
    /// Characters are Unicode scalar values. A JavaScript `.length` check counts
    /// UTF-16 code units instead, so a character outside the Basic Multilingual
    /// Plane (most emoji) counts once here and twice there. A 31-character
    /// passphrase containing one emoji is rejected here but passes such a check.
    pub fn is_usable(&self) -> bool {
        self.0.chars().count() >= MIN_PASSPHRASE_LEN
    }

    /// Raw UTF-8 bytes fed to key derivation.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}

/// Supplies the current passphrase to the cipher.
///
/// Implementations are consulted on every encrypt/decrypt call, so a source that
/// reads the environment picks up a new value as soon as the process sees one.
/// Returns `None` when no passphrase is provisioned.
#[cfg_attr(test, mockall::automock)]
pub trait PassphraseSource: Send + Sync {
    fn passphrase(&self) -> Option<Passphrase>;
}

/// Reads the passphrase from an environment variable on every call.
///
/// Unset, empty, and non-UTF-8 values are all reported as missing.
#[derive(Debug, Clone)]
pub struct EnvPassphrase {
    var: String,
}

impl EnvPassphrase {
    /// Read from the environment variable named `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl PassphraseSource for EnvPassphrase {
    fn passphrase(&self) -> Option<Passphrase> {
        match std::env::var(&self.var) {
            Ok(value) if !value.is_empty() => Some(Passphrase::new(value)),
            _ => None,
        }
    }
}

/// A fixed passphrase supplied at construction time.
#[derive(Debug, Clone)]
pub struct StaticPassphrase(Option<Passphrase>);

impl StaticPassphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Some(Passphrase::new(value)))
    }

    /// A source that never yields a passphrase.
    pub fn missing() -> Self {
        Self(None)
    }
}

impl PassphraseSource for StaticPassphrase {
    fn passphrase(&self) -> Option<Passphrase> {
        self.0.clone()
    }
}
