//! PBKDF2-HMAC-SHA512 key derivation.
//!
//! 100,000 iterations is the compatibility baseline for values already stored.
//! It is below current guidance for this hash; raising it changes every derived
//! key and therefore needs a versioned ciphertext format.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use zeroize::Zeroizing;

/// Number of PBKDF2 iterations.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of the derived AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Derive the per-value AES-256 key from the passphrase and salt.
///
/// Deterministic: the same passphrase and salt always give the same key, which is
/// what lets decryption work without storing the key.
pub fn derive_key(passphrase: &[u8], salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    derive_key_with_rounds(passphrase, salt, PBKDF2_ITERATIONS)
}

fn derive_key_with_rounds(
    passphrase: &[u8],
    salt: &[u8],
    rounds: u32,
) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha512>(passphrase, salt, rounds, &mut key[..]);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector_single_round() {
        // PBKDF2-HMAC-SHA512("password", "salt", 1), first 32 bytes.
        let key = derive_key_with_rounds(b"password", b"salt", 1);
        assert_eq!(
            hex::encode(*key),
            "867f70cf1ade02cff3752599a3a53dc4af34c7a669815ae5d513554e1c8cf252"
        );
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let salt = [7u8; 64];
        let a = derive_key(b"an-operator-provisioned-passphrase", &salt);
        let b = derive_key(b"an-operator-provisioned-passphrase", &salt);
        assert_eq!(*a, *b);
    }

    #[test]
    fn salt_changes_key() {
        let a = derive_key(b"an-operator-provisioned-passphrase", &[1u8; 64]);
        let b = derive_key(b"an-operator-provisioned-passphrase", &[2u8; 64]);
        assert_ne!(*a, *b);
    }

    #[test]
    fn rounds_change_key() {
        let a = derive_key_with_rounds(b"pw", b"salt", 1);
        let b = derive_key_with_rounds(b"pw", b"salt", 2);
        assert_ne!(*a, *b);
    }
}
