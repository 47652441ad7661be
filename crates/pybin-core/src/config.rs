//! Application configuration
//!
//! Loaded from TOML; every section and field is optional.
//!
//! ```toml
//! [store]
//! root = "/srv/pybin/media"
//! memory_capacity_bytes = 67108864
//!
//! [formatters]
//! tool_timeout_secs = 30
//! ```

use crate::error::StartupError;
use pybin_format::FormatterConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default store root, relative to the working directory
pub const DEFAULT_STORE_ROOT: &str = "media";

/// Default size of the in-memory read layer
pub const DEFAULT_MEMORY_CAPACITY_BYTES: u64 = 64 * 1024 * 1024;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Artifact storage
    pub store: StoreConfig,
    /// Formatter strategies
    pub formatters: FormatterConfig,
}

impl AppConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// [`StartupError::ConfigRead`] or [`StartupError::ConfigParse`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| StartupError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// [`StartupError::ConfigParse`] for malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, StartupError> {
        Ok(toml::from_str(text)?)
    }

    /// With store root
    #[inline]
    #[must_use]
    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.store.root = root.into();
        self
    }

    /// With in-memory read layer size, `0` disables it
    #[inline]
    #[must_use]
    pub fn with_memory_capacity(mut self, bytes: u64) -> Self {
        self.store.memory_capacity_bytes = bytes;
        self
    }

    /// With formatter configuration
    #[inline]
    #[must_use]
    pub fn with_formatters(mut self, formatters: FormatterConfig) -> Self {
        self.formatters = formatters;
        self
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding originals and derived artifacts
    pub root: PathBuf,
    /// Byte budget of the in-memory read layer
    pub memory_capacity_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORE_ROOT),
            memory_capacity_bytes: DEFAULT_MEMORY_CAPACITY_BYTES,
        }
    }
}
