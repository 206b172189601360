//! SHA-256 fingerprints for request paths and asset content
//!
//! Both functions are unsalted so identical content deduplicates across
//! deployments and projects.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::ManifestError;

/// Bytes kept from the path digest
pub const PATH_HASH_SIZE: usize = 16;

/// Full SHA-256 digest size
pub const CONTENT_HASH_SIZE: usize = 32;

/// Truncated SHA-256 of a request path; the manifest's sort and search key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathHash(pub [u8; PATH_HASH_SIZE]);

/// SHA-256 of an asset's bytes; storage key and public eTag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; CONTENT_HASH_SIZE]);

/// Fingerprint a request path.
pub fn hash_path(path: &str) -> PathHash {
    let digest = Sha256::digest(path.as_bytes());
    let mut out = [0u8; PATH_HASH_SIZE];
    out.copy_from_slice(&digest[..PATH_HASH_SIZE]);
    PathHash(out)
}

/// Fingerprint asset content.
pub fn hash_content(data: &[u8]) -> ContentHash {
    ContentHash(Sha256::digest(data).into())
}

impl PathHash {
    pub fn as_bytes(&self) -> &[u8; PATH_HASH_SIZE] {
        &self.0
    }
}

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8; CONTENT_HASH_SIZE] {
        &self.0
    }

    /// Format as 64 lowercase hex chars
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse exactly 64 hex chars, either case
    pub fn from_hex(input: &str) -> Result<Self, ManifestError> {
        let invalid = |reason| ManifestError::InvalidHash {
            input: input.chars().take(80).collect(),
            reason,
        };
        if input.len() != CONTENT_HASH_SIZE * 2 {
            return Err(invalid("expected 64 hex characters"));
        }
        let mut out = [0u8; CONTENT_HASH_SIZE];
        hex::decode_to_slice(input, &mut out).map_err(|_| invalid("not hexadecimal"))?;
        Ok(ContentHash(out))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Debug for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathHash({})", hex::encode(self.0))
    }
}

impl std::str::FromStr for ContentHash {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentHash::from_hex(s)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ContentHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_vectors() {
        // SHA-256("") and SHA-256("abc")
        assert_eq!(
            hash_content(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hash_content(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hex::encode(hash_path("abc").0), "ba7816bf8f01cfea414140de5dae2223");
    }

    #[test]
    fn path_hash_is_content_prefix() {
        let p = hash_path("/index.html");
        let c = hash_content(b"/index.html");
        assert_eq!(&c.0[..PATH_HASH_SIZE], &p.0[..]);
    }

    #[test]
    fn hex_accepts_uppercase() {
        let h = hash_content(b"hello cairn");
        let upper = h.to_hex().to_uppercase();
        assert_eq!(ContentHash::from_hex(&upper).unwrap(), h);
        assert_eq!(h.to_string(), h.to_hex());
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert!(ContentHash::from_hex("abc").is_err());
        assert!(ContentHash::from_hex(&"g".repeat(64)).is_err());
        assert!(ContentHash::from_hex(&"a".repeat(65)).is_err());
    }

    #[test]
    fn serde_as_hex_string() {
        let h = hash_content(b"x");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    proptest! {
        #[test]
        fn content_hash_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..=4096)) {
            prop_assert_eq!(hash_content(&data), hash_content(&data));
        }

        #[test]
        fn path_hash_is_deterministic(path in "/[a-z0-9/._-]{0,64}") {
            prop_assert_eq!(hash_path(&path), hash_path(&path));
        }
    }
}
