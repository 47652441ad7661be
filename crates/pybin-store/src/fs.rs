//! Filesystem-backed store
//!
//! Layout under the media root:
//!
//! ```text
//! <root>/<address>/original.py
//! <root>/<address>/derived/<tag>.py
//! ```
//!
//! Every write lands in a hidden temporary file next to its destination, is
//! flushed to disk, and is then renamed into place. Readers therefore see
//! either no file or the complete file, never a truncated one.

use crate::error::{StoreError, StoreResult};
use crate::key::{validate_tag, ArtifactKey};
use crate::store::ContentStore;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// File name of the original text inside an address directory
const ORIGINAL_STEM: &str = "original";

/// Subdirectory holding derived artifacts
const DERIVED_SUBDIR: &str = "derived";

/// Extension of every stored blob
const BLOB_EXT: &str = "py";

/// Content store rooted at a directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create store rooted at `root`
    ///
    /// The directory is created lazily on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if it does not exist yet
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the directory cannot be created
    pub async fn ensure_root(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))
    }

    /// Root directory of the store
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the blob stored under `key`
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidKey`] if the derivation tag is not a
    /// safe path component
    pub fn blob_path(&self, key: &ArtifactKey) -> StoreResult<PathBuf> {
        let dir = self.root.join(key.address().to_string());
        match key.derivation() {
            None => Ok(dir.join(format!("{ORIGINAL_STEM}.{BLOB_EXT}"))),
            Some(tag) => {
                validate_tag(tag)?;
                Ok(dir.join(DERIVED_SUBDIR).join(format!("{tag}.{BLOB_EXT}")))
            }
        }
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
        let parent = path
            .parent()
            .ok_or_else(|| StoreError::io(path, std::io::ErrorKind::InvalidInput.into()))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;

        // Same directory as the destination so the rename stays on one filesystem
        let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4()));

        let written = async {
            let mut file = tokio::fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StoreError::io(&temp_path, e));
        }

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StoreError::io(path, e));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl ContentStore for FsStore {
    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool> {
        let path = self.blob_path(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    async fn read(&self, key: &ArtifactKey) -> StoreResult<Bytes> {
        let path = self.blob_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.clone()))
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn write(&self, key: &ArtifactKey, data: &[u8]) -> StoreResult<()> {
        let path = self.blob_path(key)?;
        Self::write_atomic(&path, data).await?;
        tracing::debug!(%key, bytes = data.len(), path = %path.display(), "blob published");
        Ok(())
    }
}
