//! Error types for derivation and startup
//!
//! [`DeriveError`] is what a request sees; [`StartupError`] is fatal and
//! only raised while wiring the application together.

use pybin_format::FormatError;
use pybin_store::{ContentHash, StoreError};
use std::path::PathBuf;
use std::time::Duration;

/// Errors from [`DerivationCache::derive`](crate::DerivationCache::derive)
#[derive(Debug, thiserror::Error)]
pub enum DeriveError {
    /// Strategy name is not registered
    #[error("unknown strategy: '{0}'")]
    UnknownStrategy(String),

    /// No original stored at the address
    #[error("no snippet stored at {0}")]
    OriginalMissing(ContentHash),

    /// Strategy ran and failed; nothing was stored
    #[error("strategy '{strategy}' failed: {reason}")]
    StrategyExecutionFailed {
        /// Strategy name
        strategy: String,
        /// Human-readable cause
        reason: String,
    },

    /// External tool exceeded its time limit; nothing was stored
    #[error("strategy '{strategy}' timed out after {after:?}")]
    StrategyTimeout {
        /// Strategy name
        strategy: String,
        /// Configured limit
        after: Duration,
    },

    /// Store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl DeriveError {
    /// Whether the request named something that does not exist
    ///
    /// Front ends map these to "not found".
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::UnknownStrategy(_) | Self::OriginalMissing(_) => true,
            Self::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}

impl From<FormatError> for DeriveError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Timeout { strategy, after } => Self::StrategyTimeout { strategy, after },
            FormatError::ExecutionFailed { strategy, reason } => {
                Self::StrategyExecutionFailed { strategy, reason }
            }
            FormatError::Io { strategy, source } => Self::StrategyExecutionFailed {
                strategy,
                reason: source.to_string(),
            },
            other => Self::StrategyExecutionFailed {
                strategy: strategy_of(&other).to_string(),
                reason: other.to_string(),
            },
        }
    }
}

fn strategy_of(err: &FormatError) -> &str {
    match err {
        FormatError::ToolUnavailable { strategy, .. }
        | FormatError::ExecutionFailed { strategy, .. }
        | FormatError::Timeout { strategy, .. }
        | FormatError::HealthCheckFailed { strategy, .. }
        | FormatError::Config { strategy, .. }
        | FormatError::Io { strategy, .. } => strategy,
        FormatError::InvalidName { name, .. } | FormatError::DuplicateStrategy(name) => name,
    }
}

/// Errors from [`Snippet::create`](crate::Snippet::create)
#[derive(Debug, thiserror::Error)]
pub enum SnippetError {
    /// Display name is empty or longer than the limit
    #[error("invalid snippet name ({len} chars, expected 1..={max})")]
    InvalidName {
        /// Supplied length in characters
        len: usize,
        /// Maximum length
        max: usize,
    },

    /// Original could not be stored
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Fatal errors while starting the application
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration file could not be read
    #[error("cannot read config {path}: {source}")]
    ConfigRead {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Strategy registry could not be built
    #[error("formatter registry: {0}")]
    Registry(#[from] FormatError),

    /// Store could not be initialised
    #[error("store initialisation: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for derivation
pub type DeriveResult<T> = Result<T, DeriveError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pybin_store::ArtifactKey;

    #[test]
    fn timeout_maps_to_strategy_timeout() {
        let err: DeriveError = FormatError::Timeout {
            strategy: "docformatter".to_string(),
            after: Duration::from_secs(30),
        }
        .into();
        assert!(matches!(err, DeriveError::StrategyTimeout { ref strategy, .. } if strategy == "docformatter"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn execution_failure_keeps_reason() {
        let err: DeriveError = FormatError::execution_failed("autoflake", "exit status: 1").into();
        assert_eq!(err.to_string(), "strategy 'autoflake' failed: exit status: 1");
    }

    #[test]
    fn not_found_classification() {
        let address = ContentHash::compute(b"gone");
        assert!(DeriveError::UnknownStrategy("black".to_string()).is_not_found());
        assert!(DeriveError::OriginalMissing(address).is_not_found());
        assert!(DeriveError::Store(StoreError::NotFound(ArtifactKey::original(address))).is_not_found());
        assert!(!DeriveError::Store(StoreError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::Other, "disk")
        ))
        .is_not_found());
    }
}
