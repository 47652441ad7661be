//! Snippet records
//!
//! A [`Snippet`] is the metadata row of one saved piece of code. The text
//! itself lives in the content store under the snippet's address.

use crate::cache::DerivationCache;
use crate::error::{DeriveResult, SnippetError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use pybin_store::{ArtifactKey, ContentDigests, ContentHash, ContentStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted display name, in characters
pub const MAX_NAME_LEN: usize = 200;

/// Saved code snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Random record id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Owning user, `None` for anonymous snippets
    pub owner: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Digests of the stored text, computed once at creation
    pub digests: ContentDigests,
}

impl Snippet {
    /// Store `code` and create its record
    ///
    /// `\r\n` line endings are normalised to `\n` before hashing. Identical
    /// texts share one stored original.
    ///
    /// # Errors
    /// [`SnippetError::InvalidName`] for empty or overlong names, or
    /// [`SnippetError::Store`] when the original cannot be written.
    #[tracing::instrument(skip(cache, code), fields(bytes = code.len()))]
    pub async fn create(
        cache: &DerivationCache,
        name: &str,
        owner: Option<&str>,
        code: &str,
    ) -> Result<Self, SnippetError> {
        let len = name.chars().count();
        if len == 0 || len > MAX_NAME_LEN {
            return Err(SnippetError::InvalidName {
                len,
                max: MAX_NAME_LEN,
            });
        }

        let text = code.replace("\r\n", "\n");
        let digests = ContentDigests::compute(text.as_bytes());
        let key = ArtifactKey::original(digests.address);

        if cache.store().exists(&key).await? {
            tracing::debug!(%key, "original already stored");
        } else {
            cache.store().write(&key, text.as_bytes()).await?;
            tracing::info!(%key, "stored original");
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner: owner.map(str::to_string),
            created_at: Utc::now(),
            digests,
        })
    }

    /// Content address of the stored text
    #[inline]
    #[must_use]
    pub fn address(&self) -> &ContentHash {
        &self.digests.address
    }

    /// Original text
    ///
    /// # Errors
    /// See [`DerivationCache::derive`].
    pub async fn code(&self, cache: &DerivationCache) -> DeriveResult<Bytes> {
        cache.derive(self.address(), None).await
    }

    /// Text as formatted by `strategy`
    ///
    /// # Errors
    /// See [`DerivationCache::derive`].
    pub async fn formatted(&self, cache: &DerivationCache, strategy: &str) -> DeriveResult<Bytes> {
        cache.derive(self.address(), Some(strategy)).await
    }
}
