//! Identifier generation for trigger rule/target pairs.
//!
//! Identifiers follow the canonical `8-4-4-4-12` lowercase hexadecimal UUID
//! grouping. Two flavours are provided:
//!
//! - [`RandomIdentifierGenerator`] draws a version 4 UUID from the operating
//!   system's random source. Uniqueness is probabilistic.
//! - [`identifier_from_key`] hashes a caller-supplied logical key, so the same
//!   key always yields the same identifier. A runtime can use this to derive a
//!   request token that survives process restarts.
//!
//! # Example
//!
//! ```rust
//! use cfn_reinvoke::identifier::{identifier_from_key, is_canonical_identifier, new_identifier};
//!
//! let id = new_identifier().unwrap();
//! assert!(is_canonical_identifier(&id));
//!
//! let a = identifier_from_key("stack-1/MyBucket", 0);
//! let b = identifier_from_key("stack-1/MyBucket", 0);
//! assert_eq!(a, b);
//! assert!(is_canonical_identifier(&a));
//! ```

use blake2::{Blake2b512, Digest};
use uuid::{Builder, Uuid};

use crate::error::ReinvokeError;

/// Source of fresh identifiers.
///
/// Failure means the randomness source is unusable. Callers should treat it as
/// a fatal configuration problem, not a transient one.
pub trait IdentifierGenerator: Send + Sync {
    /// Returns a new identifier in canonical UUID grouping.
    fn new_identifier(&self) -> Result<String, ReinvokeError>;
}

/// Generates random version 4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdentifierGenerator;

impl IdentifierGenerator for RandomIdentifierGenerator {
    fn new_identifier(&self) -> Result<String, ReinvokeError> {
        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes).map_err(|e| {
            ReinvokeError::identifier(format!("random source unavailable: {}", e))
        })?;
        Ok(Builder::from_random_bytes(bytes)
            .into_uuid()
            .hyphenated()
            .to_string())
    }
}

/// Returns a new random identifier from the default generator.
pub fn new_identifier() -> Result<String, ReinvokeError> {
    RandomIdentifierGenerator.new_identifier()
}

/// Derives a deterministic identifier from a logical key and seed.
///
/// The key and seed are hashed with BLAKE2b; the first 16 bytes become the
/// identifier with the version 4 and RFC 4122 variant bits set. Different
/// seeds give independent identifiers for the same key.
pub fn identifier_from_key(key: &str, seed: u64) -> String {
    let mut hasher = Blake2b512::new();
    hasher.update(key.as_bytes());
    hasher.update(seed.to_le_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes).hyphenated().to_string()
}

/// Returns true if `value` matches the `8-4-4-4-12` hexadecimal grouping.
///
/// Both upper and lower case hex digits are accepted.
pub fn is_canonical_identifier(value: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    let mut parts = value.split('-');
    for expected in GROUPS {
        match parts.next() {
            Some(part) if part.len() == expected && part.bytes().all(|b| b.is_ascii_hexdigit()) => {}
            _ => return false,
        }
    }
    parts.next().is_none()
}
