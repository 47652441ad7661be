//! Out-of-process formatter tools
//!
//! An [`ExternalTool`] rewrites a private scratch copy of the source in
//! place. The scratch directory is removed on every exit path, so output of
//! a failed or killed run is never observable.

use crate::error::FormatError;
use crate::strategy::{ExecutionMode, FormatStrategy};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Scratch file name handed to tools
const SCRATCH_FILE: &str = "snippet.py";

/// Longest stderr excerpt carried in an error
const STDERR_EXCERPT: usize = 512;

/// Executable invoked as `program <args...> <scratch file>`
#[derive(Debug, Clone)]
pub struct ExternalTool {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    success_codes: Vec<i32>,
}

impl ExternalTool {
    /// Resolve `program` on `PATH` (or as a path) and build the tool
    ///
    /// # Errors
    /// Returns [`FormatError::ToolUnavailable`] when the program cannot be
    /// found.
    pub fn locate(
        name: impl Into<String>,
        program: &str,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, FormatError> {
        let name = name.into();
        let resolved = which::which(program).map_err(|source| FormatError::ToolUnavailable {
            strategy: name.clone(),
            program: program.to_string(),
            source,
        })?;

        tracing::debug!(strategy = %name, program = %resolved.display(), "located external tool");

        Ok(Self {
            name,
            program: resolved,
            args: args.into_iter().map(Into::into).collect(),
            timeout: None,
            success_codes: vec![0],
        })
    }

    /// Kill the tool if it runs longer than `timeout`
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Exit codes treated as success (default `[0]`)
    #[must_use]
    pub fn with_success_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.success_codes = codes.into_iter().collect();
        self
    }

    /// Resolved executable path
    #[inline]
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments placed before the scratch path
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Configured timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn run(&self, scratch: &Path) -> Result<std::process::Output, FormatError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(scratch)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| FormatError::Timeout {
                    strategy: self.name.clone(),
                    after: limit,
                })?,
            None => cmd.output().await,
        };
        output.map_err(|e| FormatError::io(&self.name, e))
    }

    fn accepts(&self, status: std::process::ExitStatus) -> bool {
        status
            .code()
            .is_some_and(|code| self.success_codes.contains(&code))
    }

    /// Run against a scratch file at `path` inside a private directory
    async fn format_in(&self, path: &Path, source: &[u8]) -> Result<Vec<u8>, FormatError> {
        tokio::fs::write(path, source)
            .await
            .map_err(|e| FormatError::io(&self.name, e))?;

        let output = match self.run(path).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "external tool did not complete");
                return Err(e);
            }
        };

        if !self.accepts(output.status) {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            tracing::warn!(status = %output.status, "external tool failed");
            return Err(FormatError::execution_failed(
                &self.name,
                format!("{} ({excerpt})", output.status),
            ));
        }

        let formatted = tokio::fs::read(path)
            .await
            .map_err(|e| FormatError::io(&self.name, e))?;
        tracing::debug!(output_bytes = formatted.len(), "external tool finished");
        Ok(formatted)
    }
}

#[async_trait::async_trait]
impl FormatStrategy for ExternalTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::External
    }

    #[tracing::instrument(skip(self, source), fields(strategy = %self.name, bytes = source.len()))]
    async fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError> {
        let scratch = tokio::task::spawn_blocking(|| {
            tempfile::Builder::new().prefix("pybin-").tempdir()
        })
        .await
        .map_err(|e| FormatError::io(&self.name, std::io::Error::other(e)))?
        .map_err(|e| FormatError::io(&self.name, e))?;

        let result = self.format_in(&scratch.path().join(SCRATCH_FILE), source).await;

        // A cancelled call still removes the directory when `scratch` drops
        match tokio::task::spawn_blocking(move || scratch.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "scratch directory not removed"),
            Err(e) => tracing::warn!(error = %e, "scratch cleanup task failed"),
        }
        result
    }

    fn health_check(&self) -> Result<(), FormatError> {
        if self.program.is_file() {
            Ok(())
        } else {
            Err(FormatError::HealthCheckFailed {
                strategy: self.name.clone(),
                reason: format!("{} is not a file", self.program.display()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_unavailable() {
        let err = ExternalTool::locate("ghost", "pybin-no-such-tool-7f3a", ["--in-place"])
            .unwrap_err();
        assert!(matches!(err, FormatError::ToolUnavailable { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn located_tool_passes_health_check() {
        let tool = ExternalTool::locate("shell", "sh", Vec::<String>::new()).unwrap();
        assert!(tool.program().is_absolute());
        assert_eq!(tool.mode(), ExecutionMode::External);
        assert!(tool.health_check().is_ok());
        assert_eq!(tool.timeout(), None);
    }

    #[tokio::test]
    async fn tool_output_is_read_back() {
        let tool = ExternalTool::locate("tac", "sh", ["-c", "printf 'b\\na\\n' > \"$0\""]).unwrap();
        let out = tool.format(b"a\nb\n").await.unwrap();
        assert_eq!(out, b"b\na\n");
    }
}
