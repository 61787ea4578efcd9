//! Station API key generation and verification
//!
//! The stored value is a SHA-256 of the full key; verification compares
//! digests in constant time so a connecting station cannot probe the key
//! byte by byte.

use rand::Rng;
use sha2::{Digest, Sha256};

/// API key prefix for identification
const API_KEY_PREFIX: &str = "evg_";

/// Generate a fresh station key. The plaintext is shown once; only the
/// hash is persisted.
pub fn generate_api_key() -> (String, String) {
    let random_part: String = {
        let mut rng = rand::thread_rng();
        (0..32)
            .map(|_| {
                let byte: u8 = rng.gen();
                format!("{:02x}", byte)
            })
            .collect()
    };
    let key = format!("{API_KEY_PREFIX}{random_part}");
    let hash = hash_api_key(&key);
    (key, hash)
}

/// SHA-256 hex digest of a key.
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a presented key against the stored hash, constant-time.
pub fn verify_api_key(presented: &str, stored_hash: &str) -> bool {
    let presented_hash = hash_api_key(presented);
    constant_time_eq(presented_hash.as_bytes(), stored_hash.as_bytes())
}

/// Compare two presented keys (master-key path), constant-time over the
/// digests so length differences leak nothing.
pub fn keys_match(a: &str, b: &str) -> bool {
    constant_time_eq(hash_api_key(a).as_bytes(), hash_api_key(b).as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_verifies_against_its_hash() {
        let (key, hash) = generate_api_key();
        assert!(key.starts_with(API_KEY_PREFIX));
        assert!(verify_api_key(&key, &hash));
    }

    #[test]
    fn wrong_key_does_not_verify() {
        let (_, hash) = generate_api_key();
        assert!(!verify_api_key("evg_wrong", &hash));
    }

    #[test]
    fn keys_match_is_exact() {
        assert!(keys_match("abc", "abc"));
        assert!(!keys_match("abc", "abd"));
        assert!(!keys_match("abc", "abcd"));
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(hash_api_key("x"), hash_api_key("x"));
        assert_ne!(hash_api_key("x"), hash_api_key("y"));
    }
}
