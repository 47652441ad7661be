//! Error types for formatter strategies
//!
//! Covers both registry construction (missing tools, bad names, failed
//! health checks) and individual invocations (nonzero exits, timeouts).

use pybin_store::KeyError;
use std::time::Duration;

/// Strategy construction and invocation errors
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// External executable could not be located
    #[error("tool '{program}' for strategy '{strategy}' is unavailable: {source}")]
    ToolUnavailable {
        /// Strategy name
        strategy: String,
        /// Program that was searched for
        program: String,
        /// Lookup failure
        #[source]
        source: which::Error,
    },

    /// Transformation failed (nonzero exit, undecodable input, ...)
    #[error("strategy '{strategy}' failed: {reason}")]
    ExecutionFailed {
        /// Strategy name
        strategy: String,
        /// Human-readable cause
        reason: String,
    },

    /// External tool did not finish in time
    #[error("strategy '{strategy}' timed out after {after:?}")]
    Timeout {
        /// Strategy name
        strategy: String,
        /// Configured limit
        after: Duration,
    },

    /// Strategy name is not a valid derivation tag
    #[error("invalid strategy name '{name}': {source}")]
    InvalidName {
        /// Rejected name
        name: String,
        /// Why it was rejected
        #[source]
        source: KeyError,
    },

    /// Two strategies registered under one name
    #[error("strategy '{0}' registered twice")]
    DuplicateStrategy(String),

    /// Startup health check failed
    #[error("health check for strategy '{strategy}' failed: {reason}")]
    HealthCheckFailed {
        /// Strategy name
        strategy: String,
        /// Human-readable cause
        reason: String,
    },

    /// Strategy definition is unusable
    #[error("invalid configuration for strategy '{strategy}': {reason}")]
    Config {
        /// Strategy name
        strategy: String,
        /// Human-readable cause
        reason: String,
    },

    /// Scratch file handling failed
    #[error("io error for strategy '{strategy}': {source}")]
    Io {
        /// Strategy name
        strategy: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl FormatError {
    /// Create execution failure for strategy
    pub fn execution_failed(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    /// Create IO error for strategy
    pub fn io(strategy: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            strategy: strategy.into(),
            source,
        }
    }

    /// Whether the error was raised while building the registry
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ToolUnavailable { .. }
                | Self::InvalidName { .. }
                | Self::DuplicateStrategy(_)
                | Self::HealthCheckFailed { .. }
                | Self::Config { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_failed_display() {
        let err = FormatError::execution_failed("autoflake", "exited with status 2");
        assert_eq!(
            err.to_string(),
            "strategy 'autoflake' failed: exited with status 2"
        );
        assert!(!err.is_configuration());
    }

    #[test]
    fn timeout_display() {
        let err = FormatError::Timeout {
            strategy: "docformatter".to_string(),
            after: Duration::from_secs(3),
        };
        assert!(err.to_string().contains("timed out after 3s"));
    }

    #[test]
    fn duplicate_is_configuration() {
        assert!(FormatError::DuplicateStrategy("pep8".to_string()).is_configuration());
    }
}
