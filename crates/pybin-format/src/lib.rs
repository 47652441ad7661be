//! pybin formatter strategies
//!
//! Named transformations from Python source to formatted source, and the
//! immutable registry that hands them out.
//!
//! # Strategies
//!
//! | Name           | Mode       | Behaviour                                  |
//! |----------------|------------|--------------------------------------------|
//! | `pep8`         | in-process | PEP 8 layout fixer, aggressive, 79 columns |
//! | `docformatter` | external   | `docformatter --pre-summary-newline`       |
//! | `autoflake`    | external   | unused import / variable removal           |
//! | `unify`        | in-process | prefer single-quoted string literals       |
//!
//! # Example
//!
//! ```rust,ignore
//! use pybin_format::{FormatterConfig, StrategyRegistry};
//!
//! let registry = StrategyRegistry::from_config(&FormatterConfig::default())?;
//! let pep8 = registry.get("pep8").unwrap();
//! let fixed = pep8.format(b"x=[ 1,2 ]").await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod error;
mod external;
mod lexer;
mod pep8;
mod registry;
mod strategy;
mod unify;
mod wrap;

// Re-exports
pub use config::{FormatterConfig, StrategyKind, StrategySpec, DEFAULT_TOOL_TIMEOUT_SECS};
pub use error::FormatError;
pub use external::ExternalTool;
pub use pep8::{Pep8Fixer, PEP8};
pub use registry::{RegistryBuilder, StrategyRegistry};
pub use strategy::{ExecutionMode, FormatStrategy};
pub use unify::{QuoteStyle, QuoteUnifier, UNIFY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
