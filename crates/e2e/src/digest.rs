//! SHA-256 digests for display and audit

use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 of `text`
pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Digest of the environment secret, shown before every test
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedKey(String);

impl EncryptedKey {
    pub fn from_secret(secret: &str) -> Self {
        Self(sha256_hex(secret))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncryptedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EncryptedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncryptedKey").field(&self.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_deterministic_and_fixed_length() {
        assert_eq!(sha256_hex("abc"), sha256_hex("abc"));
        let long = "x".repeat(10_000);
        for input in ["", "a", long.as_str()] {
            let digest = sha256_hex(input);
            assert_eq!(digest.len(), 64);
            assert!(digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn test_encrypted_key_wraps_digest() {
        let key = EncryptedKey::from_secret("abc");
        assert_eq!(key.as_str(), sha256_hex("abc"));
        assert_eq!(key.to_string(), key.as_str());
    }
}
