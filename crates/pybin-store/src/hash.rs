//! Content-addressed hashing primitives
//!
//! Provides [`ContentHash`], the 32-byte address under which snippet text and
//! every artifact derived from it are stored, and [`ContentDigests`], the set
//! of digests computed once when a snippet is created.

use sha2::{Digest, Sha256};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content address (Blake3)
///
/// Identical byte sequences always produce the same address, so two snippets
/// with the same text share every derived artifact. Immutable and `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create hash from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| HashError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Compute the Blake3 address of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8; 32]> for ContentHash {
    fn as_ref(&self) -> &[u8; 32] {
        &self.0
    }
}

// Addresses travel as hex strings in config files and CLI output
impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str> as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Digests computed once from a snippet's authoritative text
///
/// Only [`ContentDigests::address`] is used for storage. The SHA-256 digest
/// is integrity metadata shown to users and never used as a key.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContentDigests {
    /// Storage address (Blake3)
    pub address: ContentHash,

    /// Hex-encoded SHA-256 of the same bytes
    pub sha256: String,
}

impl ContentDigests {
    /// Compute all digests for `data`
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self {
            address: ContentHash::compute(data),
            sha256: hex::encode(Sha256::digest(data)),
        }
    }
}

/// Errors that can occur when parsing content hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Required number of bytes
        expected: usize,
        /// Number of bytes supplied
        actual: usize,
    },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn content_hash_from_slice_valid() {
        let bytes = vec![2u8; 32];
        let hash = ContentHash::from_slice(&bytes).unwrap();
        assert_eq!(hash.as_bytes(), &[2u8; 32]);
    }

    #[test]
    fn content_hash_from_slice_invalid_length() {
        let result = ContentHash::from_slice(&[1u8; 31]);
        assert!(matches!(
            result,
            Err(HashError::InvalidLength {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn identical_text_shares_address() {
        let h1 = ContentHash::compute(b"import this");
        let h2 = ContentHash::compute(b"import this");
        assert_eq!(h1, h2);
        assert_ne!(h1, ContentHash::compute(b"import that"));
    }

    #[test]
    fn content_hash_short_is_prefix() {
        let hash = ContentHash::compute(b"test");
        let short = hash.short();
        assert_eq!(short.len(), 16);
        assert!(hash.to_string().starts_with(&short));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            "not-hex".parse::<ContentHash>(),
            Err(HashError::HexDecode(_))
        ));
        assert!(matches!(
            "abcd".parse::<ContentHash>(),
            Err(HashError::InvalidLength { .. })
        ));
    }

    #[test]
    fn serde_uses_hex_string() {
        let hash = ContentHash::compute(b"test");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        let decoded: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, decoded);
    }

    #[test]
    fn digests_known_sha256() {
        let digests = ContentDigests::compute(b"abc");
        assert_eq!(
            digests.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digests.address, ContentHash::compute(b"abc"));
    }

    proptest! {
        #[test]
        fn display_parse_identity(bytes in proptest::array::uniform32(any::<u8>())) {
            let hash = ContentHash::new(bytes);
            let parsed: ContentHash = hash.to_string().parse().unwrap();
            prop_assert_eq!(hash, parsed);
        }

        #[test]
        fn compute_is_pure(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(ContentHash::compute(&data), ContentHash::compute(&data));
        }
    }
}
