//! Key generation, validation, and free-key search.
//!
//! Keys are not cryptographically secure identifiers - they are drawn from
//! `rand::thread_rng`. Guessing resistance comes from the size of the key
//! space, not from the quality of the randomness.

use crate::storage::{Storage, StorageError};
use rand::Rng;
use thiserror::Error;

/// The 21 consonants a key may contain.
const CONSONANTS: &[u8] = b"bcdfghjklmnpqrstvwxyz";

/// The 5 vowels a key may contain.
const VOWELS: &[u8] = b"aeiou";

/// Number of (consonant, vowel) pairs in a generated key.
const KEY_PAIRS: usize = 10;

/// Length in bytes of every generated key.
pub const KEY_LENGTH: usize = KEY_PAIRS * 2;

/// Maximum number of candidates [`find_free_key`] will probe before giving up.
///
/// The key space is 105^10, so hitting this cap means the backend is either
/// saturated beyond any realistic load or misreporting existence.
pub const MAX_KEY_ATTEMPTS: usize = 32;

/// Errors from the free-key search.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Every probed candidate already existed.
    #[error("no free key found after {0} attempts")]
    SpaceExhausted(usize),

    /// The backend failed while probing a candidate.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Generates a random 20-character key of alternating consonant/vowel pairs.
///
/// Each of the 10 pairs is chosen independently and uniformly from
/// {21 consonants} x {5 vowels}.
///
/// # Example
///
/// ```
/// use flashdrop::key::{generate_key, validate_key, KEY_LENGTH};
///
/// let key = generate_key();
/// assert_eq!(key.len(), KEY_LENGTH);
/// assert!(validate_key(&key));
/// ```
pub fn generate_key() -> String {
    let mut rng = rand::thread_rng();
    let mut key = String::with_capacity(KEY_LENGTH);

    for _ in 0..KEY_PAIRS {
        key.push(CONSONANTS[rng.gen_range(0..CONSONANTS.len())] as char);
        key.push(VOWELS[rng.gen_range(0..VOWELS.len())] as char);
    }

    key
}

/// Returns `true` iff every character of `key` is a lowercase ASCII letter.
///
/// This is a general syntax check, not a length check: any lowercase-only
/// string passes, not just the 20-character shape [`generate_key`] produces.
/// Backends use it to reject keys that could escape their addressing scheme
/// (path traversal, separators, null bytes) before building any path.
pub fn validate_key(key: &str) -> bool {
    key.bytes().all(|b| b.is_ascii_lowercase())
}

/// Finds a key that does not currently exist in the given backend.
///
/// Generates candidates and asks the backend whether each exists, returning
/// the first miss. Backend errors propagate immediately - the search never
/// retries past a failure. After [`MAX_KEY_ATTEMPTS`] hits in a row it fails
/// with [`KeyError::SpaceExhausted`] rather than looping forever.
///
/// The existence probe and the eventual save are not atomic as a pair: two
/// concurrent uploads can observe the same key as free and both save it.
/// With a 105^10 key space this is operationally negligible; callers that
/// need strict allocation must add a create-if-absent step of their own.
pub async fn find_free_key<S: Storage + ?Sized>(store: &S) -> Result<String, KeyError> {
    for _ in 0..MAX_KEY_ATTEMPTS {
        let key = generate_key();
        if !store.key_exists(&key).await? {
            return Ok(key);
        }
    }
    Err(KeyError::SpaceExhausted(MAX_KEY_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Metadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncRead, AsyncWrite};

    /// Test backend whose existence probe is scripted.
    struct ProbeBackend {
        probes: AtomicUsize,
        response: Result<bool, ()>,
    }

    impl ProbeBackend {
        fn always_exists() -> Self {
            Self {
                probes: AtomicUsize::new(0),
                response: Ok(true),
            }
        }

        fn always_free() -> Self {
            Self {
                probes: AtomicUsize::new(0),
                response: Ok(false),
            }
        }

        fn always_fails() -> Self {
            Self {
                probes: AtomicUsize::new(0),
                response: Err(()),
            }
        }
    }

    #[async_trait]
    impl Storage for ProbeBackend {
        async fn key_exists(&self, key: &str) -> Result<bool, StorageError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.response.map_err(|_| StorageError::Io {
                op: "exists",
                key: key.to_string(),
                source: std::io::Error::other("probe failure"),
            })
        }

        async fn get_metadata(&self, _key: &str) -> Result<Option<Metadata>, StorageError> {
            unimplemented!()
        }

        async fn save(
            &self,
            _key: &str,
            _meta: Metadata,
            _payload: &mut (dyn AsyncRead + Send + Unpin),
        ) -> Result<Metadata, StorageError> {
            unimplemented!()
        }

        async fn read(
            &self,
            _key: &str,
            _sink: &mut (dyn AsyncWrite + Send + Unpin),
        ) -> Result<u64, StorageError> {
            unimplemented!()
        }
    }

    #[test]
    fn test_generated_keys_are_valid() {
        for _ in 0..1000 {
            let key = generate_key();
            assert_eq!(key.len(), KEY_LENGTH);
            assert!(validate_key(&key), "invalid key generated: {}", key);
        }
    }

    #[test]
    fn test_generated_keys_alternate_consonant_vowel() {
        let key = generate_key();
        for (i, b) in key.bytes().enumerate() {
            if i % 2 == 0 {
                assert!(CONSONANTS.contains(&b), "byte {} of {} not a consonant", i, key);
            } else {
                assert!(VOWELS.contains(&b), "byte {} of {} not a vowel", i, key);
            }
        }
    }

    #[test]
    fn test_validate_accepts_lowercase_of_any_length() {
        assert!(validate_key("a"));
        assert!(validate_key("lolipopa"));
        assert!(validate_key("thisisaverylongbutstilllowercaseonlykey"));
    }

    #[test]
    fn test_validate_rejects_non_lowercase() {
        assert!(!validate_key("Lolipopa"));
        assert!(!validate_key("key123"));
        assert!(!validate_key("key with space"));
        assert!(!validate_key("key-with-dash"));
        assert!(!validate_key("../../etc/passwd"));
        assert!(!validate_key("key/../other"));
        assert!(!validate_key("key\0null"));
    }

    #[tokio::test]
    async fn test_find_free_key_returns_first_miss() {
        let backend = ProbeBackend::always_free();
        let key = find_free_key(&backend).await.unwrap();

        assert!(validate_key(&key));
        assert_eq!(backend.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_find_free_key_caps_attempts() {
        let backend = ProbeBackend::always_exists();
        let err = find_free_key(&backend).await.unwrap_err();

        assert!(matches!(err, KeyError::SpaceExhausted(MAX_KEY_ATTEMPTS)));
        assert_eq!(backend.probes.load(Ordering::SeqCst), MAX_KEY_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_find_free_key_propagates_backend_error_immediately() {
        let backend = ProbeBackend::always_fails();
        let err = find_free_key(&backend).await.unwrap_err();

        assert!(matches!(err, KeyError::Storage(_)));
        assert_eq!(backend.probes.load(Ordering::SeqCst), 1);
    }
}
