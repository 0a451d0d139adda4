//! Key Codec Module
//!
//! This module generates and validates the short random keys that identify
//! stored objects.
//!
//! ## Key Shape
//!
//! A generated key is 10 (consonant, vowel) pairs - 20 lowercase ASCII
//! characters like `lozuvakemirodatupesy`. Alternating consonants and vowels
//! keep keys pronounceable and human-typable, which matters when a key is
//! read out loud or copied by hand.
//!
//! ## Collision Avoidance
//!
//! There is no central key allocator. The key space is 105^10 (about
//! 1.6 x 10^19), so [`find_free_key`] simply generates candidates and probes
//! the backend until one misses - in practice a single attempt. The probe
//! loop is capped so a saturated (or lying) backend produces a clean error
//! instead of an infinite loop.
//!
//! ## Validation
//!
//! [`validate_key`] is the syntax gate for keys arriving from the outside:
//! backends map keys to filesystem paths, so anything outside `[a-z]` is
//! rejected before it can reach path construction.

pub mod codec;

// Re-export commonly used items
pub use codec::{find_free_key, generate_key, validate_key, KeyError, KEY_LENGTH, MAX_KEY_ATTEMPTS};
