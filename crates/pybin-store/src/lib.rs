//! pybin content store
//!
//! Byte storage for snippet originals and their derived artifacts, addressed
//! by content.
//!
//! # Core Concepts
//!
//! - [`ContentHash`]: 32-byte Blake3 address of a snippet's text
//! - [`ContentDigests`]: address plus display-only SHA-256
//! - [`ArtifactKey`]: structured (address, derivation tag) key
//! - [`ContentStore`]: async `exists` / `read` / `write` seam
//! - [`FsStore`], [`MemoryStore`], [`CachedStore`]: implementations
//!
//! # Example
//!
//! ```rust,ignore
//! use pybin_store::{ArtifactKey, ContentHash, ContentStore, FsStore};
//!
//! let store = FsStore::new("/srv/pybin/media");
//! let address = ContentHash::compute(b"import this");
//! store.write(&ArtifactKey::original(address), b"import this").await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod cached;
mod error;
mod fs;
mod hash;
mod key;
mod store;

// Re-exports
pub use cached::{CachedStore, HotStats};
pub use error::{StoreError, StoreResult};
pub use fs::FsStore;
pub use hash::{ContentDigests, ContentHash, HashError};
pub use key::{validate_tag, ArtifactKey, KeyError, MAX_TAG_LEN};
pub use store::{ContentStore, MemoryStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
