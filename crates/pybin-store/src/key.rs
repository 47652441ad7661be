//! Structured store keys
//!
//! An [`ArtifactKey`] pairs a content address with an optional derivation
//! tag. Keeping the pair structured (instead of concatenating the tag onto
//! the hex address) means no two distinct pairs can ever collide.

use crate::hash::ContentHash;
use std::fmt::{self, Display, Formatter};

/// Maximum length of a derivation tag
pub const MAX_TAG_LEN: usize = 64;

/// Key of a stored blob: the original text or one derivation of it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    address: ContentHash,
    derivation: Option<String>,
}

impl ArtifactKey {
    /// Key of the original text stored at `address`
    #[inline]
    #[must_use]
    pub fn original(address: ContentHash) -> Self {
        Self {
            address,
            derivation: None,
        }
    }

    /// Key of the artifact derived from `address` by `tag`
    ///
    /// # Errors
    /// Returns [`KeyError`] unless `tag` is 1..=64 chars of `[a-z0-9_-]`
    pub fn derived(address: ContentHash, tag: &str) -> Result<Self, KeyError> {
        validate_tag(tag)?;
        Ok(Self {
            address,
            derivation: Some(tag.to_string()),
        })
    }

    /// Content address of the original text
    #[inline]
    #[must_use]
    pub fn address(&self) -> &ContentHash {
        &self.address
    }

    /// Derivation tag, `None` for the original
    #[inline]
    #[must_use]
    pub fn derivation(&self) -> Option<&str> {
        self.derivation.as_deref()
    }

    /// Whether this key names the original text
    #[inline]
    #[must_use]
    pub fn is_original(&self) -> bool {
        self.derivation.is_none()
    }
}

impl Display for ArtifactKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.derivation {
            Some(tag) => write!(f, "{}[{tag}]", self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// Check that `tag` is usable as a derivation tag
///
/// # Errors
/// Returns [`KeyError`] for empty, overlong or non `[a-z0-9_-]` tags
pub fn validate_tag(tag: &str) -> Result<(), KeyError> {
    if tag.is_empty() || tag.len() > MAX_TAG_LEN {
        return Err(KeyError::InvalidLength(tag.len()));
    }
    if let Some(c) = tag
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-'))
    {
        return Err(KeyError::InvalidChar {
            tag: tag.to_string(),
            found: c,
        });
    }
    Ok(())
}

/// Invalid derivation tag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Tag is empty or longer than [`MAX_TAG_LEN`]
    #[error("derivation tag length {0} outside 1..={MAX_TAG_LEN}")]
    InvalidLength(usize),

    /// Tag holds a character outside `[a-z0-9_-]`
    #[error("derivation tag '{tag}' contains invalid character {found:?}")]
    InvalidChar {
        /// The rejected tag
        tag: String,
        /// First offending character
        found: char,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr() -> ContentHash {
        ContentHash::compute(b"x = 1")
    }

    #[test]
    fn original_has_no_derivation() {
        let key = ArtifactKey::original(addr());
        assert!(key.is_original());
        assert_eq!(key.derivation(), None);
        assert_eq!(key.to_string(), addr().to_string());
    }

    #[test]
    fn derived_key_displays_tag() {
        let key = ArtifactKey::derived(addr(), "pep8").unwrap();
        assert_eq!(key.derivation(), Some("pep8"));
        assert!(key.to_string().ends_with("[pep8]"));
    }

    #[test]
    fn rejects_path_like_tags() {
        assert!(ArtifactKey::derived(addr(), "../etc").is_err());
        assert!(ArtifactKey::derived(addr(), "a/b").is_err());
        assert!(ArtifactKey::derived(addr(), "Pep8").is_err());
        assert_eq!(
            ArtifactKey::derived(addr(), ""),
            Err(KeyError::InvalidLength(0))
        );
    }

    proptest! {
        #[test]
        fn distinct_tags_give_distinct_keys(a in "[a-z0-9_-]{1,16}", b in "[a-z0-9_-]{1,16}") {
            let ka = ArtifactKey::derived(addr(), &a).unwrap();
            let kb = ArtifactKey::derived(addr(), &b).unwrap();
            prop_assert_eq!(a == b, ka == kb);
            prop_assert_ne!(ka, ArtifactKey::original(addr()));
        }
    }
}
