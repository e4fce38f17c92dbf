//! Random key material for provisioning a new passphrase.

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use zeroize::Zeroizing;

/// Default number of random bytes produced by [`generate_key`].
pub const DEFAULT_KEY_LEN: usize = 32;

/// Return `len_bytes` bytes from the OS CSPRNG as lowercase hex.
///
/// Not used on the encrypt/decrypt path; this mints values for the passphrase
/// environment variable.
pub fn generate_key(len_bytes: usize) -> String {
    let mut bytes = Zeroizing::new(vec![0u8; len_bytes]);
    OsRng.fill_bytes(&mut bytes[..]);
    hex::encode(&*bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_length_is_64_hex_chars() {
        let key = generate_key(DEFAULT_KEY_LEN);
        assert_eq!(key.len(), 64);
        assert!(key
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn custom_length() {
        assert_eq!(generate_key(16).len(), 32);
        assert_eq!(generate_key(0), "");
    }

    #[test]
    fn thousand_calls_are_distinct() {
        let keys: HashSet<String> = (0..1000).map(|_| generate_key(DEFAULT_KEY_LEN)).collect();
        assert_eq!(keys.len(), 1000);
    }
}
