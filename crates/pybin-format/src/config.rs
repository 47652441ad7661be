//! Formatter configuration
//!
//! TOML shape:
//!
//! ```toml
//! [formatters]
//! tool_timeout_secs = 30
//!
//! [[formatters.strategies]]
//! name = "pep8"
//! kind = "pep8"
//! aggressive = true
//!
//! [[formatters.strategies]]
//! name = "autoflake"
//! kind = "external"
//! program = "autoflake"
//! args = ["--remove-all-unused-imports", "--in-place"]
//! ```

use crate::error::FormatError;
use crate::external::ExternalTool;
use crate::pep8::{Pep8Fixer, PEP8};
use crate::strategy::FormatStrategy;
use crate::unify::{QuoteStyle, QuoteUnifier, UNIFY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default limit for external tools
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// Formatter registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// Limit for each external tool run, `0` disables the limit
    pub tool_timeout_secs: u64,
    /// Strategies to register
    pub strategies: Vec<StrategySpec>,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            strategies: vec![
                StrategySpec::pep8(true),
                StrategySpec::external(
                    "docformatter",
                    "docformatter",
                    ["--pre-summary-newline", "--in-place"],
                )
                .with_success_codes([0, 3]),
                StrategySpec::external(
                    "autoflake",
                    "autoflake",
                    [
                        "--remove-all-unused-imports",
                        "--remove-duplicate-keys",
                        "--remove-unused-variables",
                        "--in-place",
                    ],
                ),
                StrategySpec::unify(QuoteStyle::Single),
            ],
        }
    }
}

impl FormatterConfig {
    /// Configuration with no strategies
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            strategies: Vec::new(),
        }
    }

    /// With external tool timeout
    #[inline]
    #[must_use]
    pub fn with_tool_timeout_secs(mut self, secs: u64) -> Self {
        self.tool_timeout_secs = secs;
        self
    }

    /// With an additional strategy
    #[inline]
    #[must_use]
    pub fn with_strategy(mut self, spec: StrategySpec) -> Self {
        self.strategies.push(spec);
        self
    }

    /// Keep only strategies whose name satisfies `keep`
    #[must_use]
    pub fn retain(mut self, keep: impl Fn(&str) -> bool) -> Self {
        self.strategies.retain(|spec| keep(&spec.name));
        self
    }

    /// External tool limit, `None` when disabled
    #[inline]
    #[must_use]
    pub fn tool_timeout(&self) -> Option<Duration> {
        (self.tool_timeout_secs > 0).then(|| Duration::from_secs(self.tool_timeout_secs))
    }

    /// Instantiate every configured strategy
    ///
    /// # Errors
    /// Returns [`FormatError::Config`] for unusable definitions and
    /// [`FormatError::ToolUnavailable`] when a program cannot be found.
    pub fn build_strategies(&self) -> Result<Vec<Arc<dyn FormatStrategy>>, FormatError> {
        self.strategies
            .iter()
            .map(|spec| spec.build(self.tool_timeout()))
            .collect()
    }
}

/// One named strategy definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySpec {
    /// Registry name
    pub name: String,
    /// What the strategy does
    #[serde(flatten)]
    pub kind: StrategyKind,
}

/// Strategy implementation selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyKind {
    /// In-process PEP 8 whitespace and line-length fixer
    Pep8 {
        /// Rewrite `== None` comparisons
        #[serde(default = "default_true")]
        aggressive: bool,
    },

    /// In-process quote unifier
    Unify {
        /// Preferred quote
        #[serde(default)]
        quote: QuoteStyle,
    },

    /// Executable rewriting a scratch file in place
    External {
        /// Program name or path
        program: String,
        /// Arguments placed before the scratch path
        #[serde(default)]
        args: Vec<String>,
        /// Exit codes treated as success
        #[serde(default = "default_success_codes")]
        success_codes: Vec<i32>,
    },
}

fn default_true() -> bool {
    true
}

fn default_success_codes() -> Vec<i32> {
    vec![0]
}

impl StrategySpec {
    /// `pep8` fixer definition
    #[must_use]
    pub fn pep8(aggressive: bool) -> Self {
        Self {
            name: PEP8.to_string(),
            kind: StrategyKind::Pep8 { aggressive },
        }
    }

    /// `unify` definition
    #[must_use]
    pub fn unify(quote: QuoteStyle) -> Self {
        Self {
            name: UNIFY.to_string(),
            kind: StrategyKind::Unify { quote },
        }
    }

    /// External tool definition
    #[must_use]
    pub fn external(
        name: impl Into<String>,
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: StrategyKind::External {
                program: program.into(),
                args: args.into_iter().map(Into::into).collect(),
                success_codes: default_success_codes(),
            },
        }
    }

    /// With accepted exit codes (external tools only)
    #[must_use]
    pub fn with_success_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        if let StrategyKind::External { success_codes, .. } = &mut self.kind {
            *success_codes = codes.into_iter().collect();
        }
        self
    }

    /// Instantiate the strategy
    ///
    /// # Errors
    /// See [`FormatterConfig::build_strategies`].
    pub fn build(&self, timeout: Option<Duration>) -> Result<Arc<dyn FormatStrategy>, FormatError> {
        match &self.kind {
            StrategyKind::Pep8 { aggressive } => {
                self.expect_name(PEP8)?;
                Ok(Arc::new(Pep8Fixer::new().aggressive(*aggressive)))
            }
            StrategyKind::Unify { quote } => {
                self.expect_name(UNIFY)?;
                Ok(Arc::new(QuoteUnifier::new(*quote)))
            }
            StrategyKind::External {
                program,
                args,
                success_codes,
            } => {
                if program.trim().is_empty() {
                    return Err(self.config_error("program must not be empty"));
                }
                if success_codes.is_empty() {
                    return Err(self.config_error("success_codes must not be empty"));
                }
                let tool = ExternalTool::locate(&self.name, program, args.iter().cloned())?
                    .with_success_codes(success_codes.iter().copied());
                Ok(Arc::new(match timeout {
                    Some(limit) => tool.with_timeout(limit),
                    None => tool,
                }))
            }
        }
    }

    fn expect_name(&self, builtin: &str) -> Result<(), FormatError> {
        if self.name == builtin {
            Ok(())
        } else {
            Err(self.config_error(format!("in-process strategy must be named '{builtin}'")))
        }
    }

    fn config_error(&self, reason: impl Into<String>) -> FormatError {
        FormatError::Config {
            strategy: self.name.clone(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        formatters: FormatterConfig,
    }

    #[test]
    fn defaults_list_known_strategies() {
        let config = FormatterConfig::default();
        let names: Vec<_> = config.strategies.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["pep8", "docformatter", "autoflake", "unify"]);
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn parses_toml() {
        let parsed: Wrapper = toml::from_str(
            r#"
            [formatters]
            tool_timeout_secs = 5

            [[formatters.strategies]]
            name = "pep8"
            kind = "pep8"

            [[formatters.strategies]]
            name = "unify"
            kind = "unify"
            quote = "double"

            [[formatters.strategies]]
            name = "black"
            kind = "external"
            program = "black"
            args = ["-q"]
            "#,
        )
        .unwrap();

        let config = parsed.formatters;
        assert_eq!(config.tool_timeout_secs, 5);
        assert_eq!(config.strategies[0], StrategySpec::pep8(true));
        assert_eq!(config.strategies[1], StrategySpec::unify(QuoteStyle::Double));
        assert_eq!(
            config.strategies[2],
            StrategySpec::external("black", "black", ["-q"])
        );
    }

    #[test]
    fn missing_section_uses_defaults() {
        let config: FormatterConfig = toml::from_str("").unwrap();
        assert_eq!(config, FormatterConfig::default());
    }

    #[test]
    fn zero_timeout_disables_limit() {
        assert_eq!(FormatterConfig::empty().with_tool_timeout_secs(0).tool_timeout(), None);
    }

    #[test]
    fn in_process_name_mismatch_is_config_error() {
        let spec = StrategySpec {
            name: "tidy".to_string(),
            kind: StrategyKind::Pep8 { aggressive: false },
        };
        let err = spec.build(None).unwrap_err();
        assert!(matches!(err, FormatError::Config { .. }));
    }

    #[test]
    fn empty_program_is_config_error() {
        let err = StrategySpec::external("x", " ", Vec::<String>::new())
            .build(None)
            .unwrap_err();
        assert!(matches!(err, FormatError::Config { .. }));
    }

    #[test]
    fn retain_filters_by_name() {
        let config = FormatterConfig::default().retain(|name| name == "unify");
        assert_eq!(config.strategies, vec![StrategySpec::unify(QuoteStyle::Single)]);
    }
}
