//! pybin core
//!
//! The formatter result cache and the snippet records built on it.
//!
//! # Architecture
//!
//! ```text
//!        Snippet::create ──write original──┐
//!                                          ▼
//! derive(address, strategy) ──► ContentStore (FsStore / CachedStore)
//!        │  miss                            ▲
//!        ▼                                  │ publish
//!   flight gate ──► StrategyRegistry ──► FormatStrategy::format
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use pybin_core::{AppConfig, DerivationCache, Snippet};
//!
//! let cache = DerivationCache::open(&AppConfig::load("pybin.toml")?).await?;
//! let snippet = Snippet::create(&cache, "demo", None, "import math").await?;
//! let cleaned = snippet.formatted(&cache, "autoflake").await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod cache;
mod config;
mod error;
mod snippet;

// Re-exports
pub use cache::{CacheStats, DerivationCache};
pub use config::{AppConfig, StoreConfig, DEFAULT_MEMORY_CAPACITY_BYTES, DEFAULT_STORE_ROOT};
pub use error::{DeriveError, DeriveResult, SnippetError, StartupError};
pub use snippet::{Snippet, MAX_NAME_LEN};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
