//! AES-256-GCM encryption of credential strings under a passphrase-derived key.
//!
//! **Algorithm:** each call draws a fresh 64-byte salt and 16-byte IV from the OS
//! CSPRNG, derives a 256-bit key with PBKDF2-HMAC-SHA512 (see [`super::kdf`]),
//! and encrypts with AES-256-GCM using the 16-byte IV and no associated data. The
//! 16-byte tag is kept detached so the stored layout is `salt:iv:tag:ciphertext`.
//!
//! GCM is a stream mode: the ciphertext has exactly as many bytes as the UTF-8
//! plaintext, including zero for the empty string.

use std::{fmt, str::FromStr, sync::Arc};

use aes_gcm::{
    aead::{
        consts::U16, generic_array::GenericArray, rand_core::RngCore, AeadInPlace, KeyInit, OsRng,
    },
    aes::Aes256,
    AesGcm,
};
use thiserror::Error;
use zeroize::Zeroizing;

use super::kdf::derive_key;
use super::passphrase::{Passphrase, PassphraseSource, MIN_PASSPHRASE_LEN};

/// Byte length of the per-value KDF salt.
pub const SALT_LEN: usize = 64;

/// Byte length of the GCM initialisation vector.
pub const IV_LEN: usize = 16;

/// Byte length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Separator between the hex fields of an encoded value.
const FIELD_SEPARATOR: char = ':';

/// AES-256-GCM with a 128-bit IV (J0 derived through GHASH, as NIST SP 800-38D
/// specifies for IVs that are not 96 bits).
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Errors produced by the cipher layer.
///
/// Callers treat [`CipherError::Configuration`] as fatal to the process, and the
/// format and authentication variants as problems with one stored value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// The passphrase is missing or shorter than [`MIN_PASSPHRASE_LEN`] characters.
    #[error("encryption passphrase is missing or shorter than {MIN_PASSPHRASE_LEN} characters")]
    Configuration,

    /// The encoded value is not four colon-separated hex fields of the right sizes.
    #[error("invalid encrypted data format")]
    InvalidFormat,

    /// Tag verification failed: the value was altered or the passphrase changed.
    #[error("authentication failed: encrypted data was altered or the passphrase changed")]
    AuthenticationFailed,

    /// The plaintext exceeds the AEAD's per-message length limit.
    #[error("plaintext too long to encrypt")]
    PlaintextTooLong,
}

/// A parsed encrypted credential.
///
/// The string representation is `hex(salt):hex(iv):hex(tag):hex(ciphertext)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecret {
    /// Per-value PBKDF2 salt.
    pub salt: [u8; SALT_LEN],
    /// Per-value GCM IV.
    pub iv: [u8; IV_LEN],
    /// Detached GCM authentication tag.
    pub tag: [u8; TAG_LEN],
    /// Ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
}

impl fmt::Display for EncryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            hex::encode(self.salt),
            hex::encode(self.iv),
            hex::encode(self.tag),
            hex::encode(&self.ciphertext),
            sep = FIELD_SEPARATOR,
        )
    }
}

impl FromStr for EncryptedSecret {
    type Err = CipherError;

    /// Parse an encoded value.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidFormat`] unless `s` has exactly four fields,
    /// each valid hex, with salt, IV, and tag of their fixed lengths.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(FIELD_SEPARATOR).collect();
        let [salt, iv, tag, ciphertext] = parts.as_slice() else {
            return Err(CipherError::InvalidFormat);
        };
        Ok(Self {
            salt: decode_fixed(salt)?,
            iv: decode_fixed(iv)?,
            tag: decode_fixed(tag)?,
            ciphertext: hex::decode(ciphertext).map_err(|_| CipherError::InvalidFormat)?,
        })
    }
}

fn decode_fixed<const N: usize>(field: &str) -> Result<[u8; N], CipherError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(field, &mut out).map_err(|_| CipherError::InvalidFormat)?;
    Ok(out)
}

/// Encrypt `plaintext` under `passphrase` with a fresh salt and IV.
///
/// The caller is responsible for checking [`Passphrase::is_usable`] first.
///
/// # Errors
///
/// Returns [`CipherError::PlaintextTooLong`] if the AEAD rejects the input length.
pub fn seal(plaintext: &[u8], passphrase: &Passphrase) -> Result<EncryptedSecret, CipherError> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(passphrase.as_bytes(), &salt);
    let cipher = Aes256Gcm16::new(GenericArray::from_slice(&key[..]));

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&iv), b"", &mut buffer)
        .map_err(|_| CipherError::PlaintextTooLong)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    Ok(EncryptedSecret {
        salt,
        iv,
        tag: tag_bytes,
        ciphertext: buffer,
    })
}

/// Decrypt and authenticate `secret` under `passphrase`.
///
/// Nothing is returned unless the tag verifies; there is no partial plaintext.
///
/// # Errors
///
/// Returns [`CipherError::AuthenticationFailed`] if tag verification fails.
pub fn open(
    secret: &EncryptedSecret,
    passphrase: &Passphrase,
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    let key = derive_key(passphrase.as_bytes(), &secret.salt);
    let cipher = Aes256Gcm16::new(GenericArray::from_slice(&key[..]));

    let mut buffer = Zeroizing::new(secret.ciphertext.clone());
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&secret.iv),
            b"",
            &mut buffer[..],
            GenericArray::from_slice(&secret.tag),
        )
        .map_err(|_| CipherError::AuthenticationFailed)?;
    Ok(buffer)
}

/// Encrypts and decrypts credential strings.
///
/// Cheap to clone; clones share the same [`PassphraseSource`]. The passphrase is
/// resolved once per call and never cached, and every call runs its own key
/// derivation, so the cipher is safe to use from any number of threads at once.
#[derive(Clone)]
pub struct CredentialCipher {
    source: Arc<dyn PassphraseSource>,
}

impl CredentialCipher {
    /// Build a cipher that reads its passphrase from `source`.
    pub fn new(source: impl PassphraseSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Returns `true` if the source currently yields a usable passphrase.
    ///
    /// Performs no cryptographic work.
    pub fn is_configured(&self) -> bool {
        self.resolve_passphrase().is_ok()
    }

    /// Encrypt a plaintext credential into its storable string form.
    ///
    /// Two calls with the same plaintext return different strings.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Configuration`] if the passphrase is missing or too
    /// short; this is checked before any randomness is drawn.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let passphrase = self.resolve_passphrase()?;
        Ok(seal(plaintext.as_bytes(), &passphrase)?.to_string())
    }

    /// Decrypt a string previously produced by [`CredentialCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// - [`CipherError::Configuration`] if the passphrase is missing or too short,
    ///   regardless of `encoded`.
    /// - [`CipherError::InvalidFormat`] if `encoded` does not parse.
    /// - [`CipherError::AuthenticationFailed`] if any field was altered or the
    ///   passphrase differs from the one used to encrypt.
    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let mut plaintext = self.open_encoded(encoded)?;
        // An authenticated value that is not UTF-8 was never produced by `encrypt`.
        String::from_utf8(std::mem::take(&mut *plaintext))
            .map_err(|_| CipherError::InvalidFormat)
    }

    /// Returns `true` if `encoded` decrypts successfully; `false` on any error.
    ///
    /// The plaintext stays in a zeroizing buffer and is never returned.
    pub fn validate(&self, encoded: &str) -> bool {
        self.open_encoded(encoded)
            .is_ok_and(|plaintext| std::str::from_utf8(&plaintext).is_ok())
    }

    fn open_encoded(&self, encoded: &str) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        let passphrase = self.resolve_passphrase()?;
        let secret: EncryptedSecret = encoded.parse()?;
        open(&secret, &passphrase)
    }

    fn resolve_passphrase(&self) -> Result<Passphrase, CipherError> {
        match self.source.passphrase() {
            Some(p) if p.is_usable() => Ok(p),
            _ => Err(CipherError::Configuration),
        }
    }
}

impl fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}
