//! Read-through in-memory layer using moka
//!
//! Stored blobs never change once written, so a hot copy can be served
//! without ever consulting the backing store again. Eviction only drops the
//! copy; the backing store keeps the blob.

use crate::error::StoreResult;
use crate::key::ArtifactKey;
use crate::store::ContentStore;
use bytes::Bytes;
use moka::future::Cache;

/// Statistics for the hot layer
#[derive(Debug, Clone, Copy, Default)]
pub struct HotStats {
    /// Number of entries held in memory
    pub entry_count: u64,

    /// Total bytes held in memory
    pub weighted_size: u64,
}

/// Store wrapper keeping recently used blobs in memory
///
/// Capacity is measured in bytes of blob content.
#[derive(Debug, Clone)]
pub struct CachedStore<S> {
    inner: S,
    hot: Cache<ArtifactKey, Bytes>,
}

impl<S: ContentStore> CachedStore<S> {
    /// Wrap `inner` with a hot layer holding at most `max_bytes`
    #[must_use]
    pub fn new(inner: S, max_bytes: u64) -> Self {
        let hot = Cache::builder()
            .max_capacity(max_bytes)
            .weigher(|_key: &ArtifactKey, blob: &Bytes| blob_weight(blob))
            .build();
        Self { inner, hot }
    }

    /// The wrapped store
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get hot layer statistics
    ///
    /// Counts are approximate until moka runs its pending maintenance.
    #[must_use]
    pub fn stats(&self) -> HotStats {
        HotStats {
            entry_count: self.hot.entry_count(),
            weighted_size: self.hot.weighted_size(),
        }
    }

    /// Drop every hot copy; the backing store is untouched
    #[inline]
    pub fn invalidate_all(&self) {
        self.hot.invalidate_all();
    }
}

/// Bytes charged against capacity; empty blobs still cost one
fn blob_weight(blob: &Bytes) -> u32 {
    u32::try_from(blob.len().max(1)).unwrap_or(u32::MAX)
}

#[async_trait::async_trait]
impl<S: ContentStore> ContentStore for CachedStore<S> {
    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool> {
        if self.hot.contains_key(key) {
            return Ok(true);
        }
        self.inner.exists(key).await
    }

    async fn read(&self, key: &ArtifactKey) -> StoreResult<Bytes> {
        if let Some(blob) = self.hot.get(key).await {
            return Ok(blob);
        }
        let blob = self.inner.read(key).await?;
        self.hot.insert(key.clone(), blob.clone()).await;
        Ok(blob)
    }

    async fn write(&self, key: &ArtifactKey, data: &[u8]) -> StoreResult<()> {
        // Backing store first: the hot copy must never exist without it
        self.inner.write(key, data).await?;
        self.hot
            .insert(key.clone(), Bytes::copy_from_slice(data))
            .await;
        Ok(())
    }
}
