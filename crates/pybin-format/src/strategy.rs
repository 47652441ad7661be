//! Formatter strategy trait and core types
//!
//! Provides the [`FormatStrategy`] trait implemented by every named
//! transformation the registry can hand out.

use crate::error::FormatError;
use std::fmt::{self, Display, Formatter};

/// How a strategy performs its work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// Pure function evaluated inside this process
    InProcess,

    /// Separate executable mutating a scratch file in place
    External,
}

impl Display for ExecutionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InProcess => "in-process",
            Self::External => "external",
        })
    }
}

/// Named transformation from source text to formatted text
///
/// # Contract
/// - `format` has no side effects visible to the caller: nothing is
///   written outside private scratch space
/// - a failed `format` returns `Err`, never partial output
/// - `health_check` is cheap and is run once when the registry is built
#[async_trait::async_trait]
pub trait FormatStrategy: Send + Sync + std::fmt::Debug {
    /// Registry key of this strategy
    fn name(&self) -> &str;

    /// Execution shape
    fn mode(&self) -> ExecutionMode;

    /// Produce the formatted version of `source`
    async fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError>;

    /// Verify the strategy can run
    ///
    /// Default implementation always succeeds.
    fn health_check(&self) -> Result<(), FormatError> {
        Ok(())
    }
}

/// Decode source bytes for a text-based in-process strategy
pub(crate) fn decode_source<'a>(strategy: &str, source: &'a [u8]) -> Result<&'a str, FormatError> {
    std::str::from_utf8(source).map_err(|e| {
        FormatError::execution_failed(strategy, format!("source is not valid UTF-8: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_display() {
        assert_eq!(ExecutionMode::InProcess.to_string(), "in-process");
        assert_eq!(ExecutionMode::External.to_string(), "external");
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let err = decode_source("pep8", &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, FormatError::ExecutionFailed { .. }));
        assert_eq!(decode_source("pep8", b"ok").unwrap(), "ok");
    }
}
