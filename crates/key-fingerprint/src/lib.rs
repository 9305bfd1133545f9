//! Key fingerprinting for content-addressed caches
//!
//! Maps any serializable key to a stable identifier: the SHA-256 digest of the
//! key's canonical JSON form. Object members are sorted at every depth, so two
//! keys that are structurally equal produce the same fingerprint regardless of
//! field or insertion order.
//!
//! Distinct keys that happen to share a fingerprint are indistinguishable to
//! callers. That is the accepted tradeoff of content-addressed naming.

mod canonical;
mod error;

pub use canonical::canonical_json;
pub use error::{FingerprintError, Result};

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable identifier for a cache key (64 lowercase hex characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a key by hashing its canonical JSON form
    pub fn of<K: Serialize + ?Sized>(key: &K) -> Result<Self> {
        let canonical = canonical_json(key)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fingerprint a key; shorthand for [`Fingerprint::of`]
pub fn fingerprint<K: Serialize + ?Sized>(key: &K) -> Result<Fingerprint> {
    Fingerprint::of(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Serialize)]
    struct RenderKey {
        template: String,
        page: u32,
    }

    #[derive(Serialize)]
    struct SwappedKey {
        page: u32,
        template: String,
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = RenderKey {
            template: "invoice".to_string(),
            page: 1,
        };
        let b = RenderKey {
            template: "invoice".to_string(),
            page: 1,
        };

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_fingerprint_ignores_field_order() {
        let a = RenderKey {
            template: "invoice".to_string(),
            page: 3,
        };
        let b = SwappedKey {
            page: 3,
            template: "invoice".to_string(),
        };

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_fingerprint_ignores_map_insertion_order() {
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for i in 0..32 {
            first.insert(format!("k{}", i), i);
        }
        for i in (0..32).rev() {
            second.insert(format!("k{}", i), i);
        }

        assert_eq!(fingerprint(&first).unwrap(), fingerprint(&second).unwrap());
    }

    #[test]
    fn test_different_keys_differ() {
        let a = RenderKey {
            template: "invoice".to_string(),
            page: 1,
        };
        let b = RenderKey {
            template: "invoice".to_string(),
            page: 2,
        };

        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_fingerprint_is_filesystem_safe() {
        let key = BTreeMap::from([("path", "../../etc/passwd"), ("sep", "a\\b:c*?")]);
        let fp = fingerprint(&key).unwrap();

        // SHA-256 hex
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_unserializable_key_is_rejected() {
        // JSON object keys must be strings
        let key = HashMap::from([((1, 2), "tuple key")]);
        let err = fingerprint(&key).unwrap_err();
        assert!(matches!(err, FingerprintError::Serialization(_)));
    }

    #[test]
    fn test_display_matches_as_str() {
        let fp = fingerprint(&"hello").unwrap();
        assert_eq!(fp.to_string(), fp.as_str());
        assert_eq!(fp.clone().into_string(), fp.as_str());
    }
}
