//! The [`ContentStore`] seam and its in-memory implementation

use crate::error::{StoreError, StoreResult};
use crate::key::ArtifactKey;
use bytes::Bytes;
use dashmap::DashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Key-value byte store addressed by [`ArtifactKey`]
///
/// # Contract
/// - `write` publishes atomically: once `exists` reports `true`, `read`
///   returns the complete bytes
/// - `read` of an absent key fails with [`StoreError::NotFound`]
/// - callers treat stored blobs as immutable
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync + Debug {
    /// Whether a blob is stored under `key`
    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool>;

    /// Read the blob stored under `key`
    async fn read(&self, key: &ArtifactKey) -> StoreResult<Bytes>;

    /// Store `data` under `key`, replacing nothing visible to readers mid-write
    async fn write(&self, key: &ArtifactKey, data: &[u8]) -> StoreResult<()>;
}

#[async_trait::async_trait]
impl<S: ContentStore + ?Sized> ContentStore for Arc<S> {
    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool> {
        (**self).exists(key).await
    }

    async fn read(&self, key: &ArtifactKey) -> StoreResult<Bytes> {
        (**self).read(key).await
    }

    async fn write(&self, key: &ArtifactKey, data: &[u8]) -> StoreResult<()> {
        (**self).write(key, data).await
    }
}

/// In-memory store
///
/// Inserts are single map operations, so publishing is atomic. Keeps a
/// write counter so callers can assert that nothing was persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: DashMap<ArtifactKey, Bytes>,
    writes: AtomicU64,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Total number of `write` calls served
    #[inline]
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl ContentStore for MemoryStore {
    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool> {
        Ok(self.blobs.contains_key(key))
    }

    async fn read(&self, key: &ArtifactKey) -> StoreResult<Bytes> {
        self.blobs
            .get(key)
            .map(|blob| blob.value().clone())
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn write(&self, key: &ArtifactKey, data: &[u8]) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.blobs
            .insert(key.clone(), Bytes::copy_from_slice(data));
        Ok(())
    }
}
