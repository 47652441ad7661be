//! Error types for store operations

use crate::key::{ArtifactKey, KeyError};
use std::path::PathBuf;

/// Errors raised by [`ContentStore`](crate::ContentStore) implementations
///
/// Store errors are fatal for the request that hit them; the store never
/// retries on its own.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O failure while touching the backing files
    #[error("store I/O error at {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// No blob stored under the key
    #[error("no artifact stored under {0}")]
    NotFound(ArtifactKey),

    /// Key cannot be mapped to a storage location
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),
}

impl StoreError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error means "nothing stored under this key"
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
