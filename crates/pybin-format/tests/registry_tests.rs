//! Registry Tests
//!
//! Building registries from configuration and running the known strategies
//! through them.

use pretty_assertions::assert_eq;
use pybin_format::{
    ExecutionMode, FormatError, FormatterConfig, QuoteStyle, StrategyRegistry, StrategySpec,
};

fn in_process_config() -> FormatterConfig {
    FormatterConfig::default().retain(|name| name == "pep8" || name == "unify")
}

#[tokio::test]
async fn test_pep8_through_registry() {
    let registry = StrategyRegistry::from_config(&in_process_config()).unwrap();
    let pep8 = registry.get("pep8").unwrap();

    assert_eq!(pep8.mode(), ExecutionMode::InProcess);
    let out = pep8.format(b"   a    =   b   +   c   ").await.unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "a = b + c\n");
}

#[tokio::test]
async fn test_unify_through_registry() {
    let registry = StrategyRegistry::from_config(&in_process_config()).unwrap();
    let unify = registry.get("unify").unwrap();

    let out = unify.format(br#" x = "abc" y"#).await.unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), " x = 'abc' y");
}

#[test]
fn test_missing_tool_fails_build() {
    let config = FormatterConfig::empty()
        .with_strategy(StrategySpec::pep8(true))
        .with_strategy(StrategySpec::external(
            "phantom",
            "pybin-phantom-formatter",
            ["--in-place"],
        ));

    let err = StrategyRegistry::from_config(&config).unwrap_err();
    match err {
        FormatError::ToolUnavailable { strategy, program, .. } => {
            assert_eq!(strategy, "phantom");
            assert_eq!(program, "pybin-phantom-formatter");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_duplicate_config_entries_rejected() {
    let config = FormatterConfig::empty()
        .with_strategy(StrategySpec::unify(QuoteStyle::Single))
        .with_strategy(StrategySpec::unify(QuoteStyle::Double));

    let err = StrategyRegistry::from_config(&config).unwrap_err();
    assert!(matches!(err, FormatError::DuplicateStrategy(ref name) if name == "unify"));
}

#[test]
fn test_external_strategy_from_config() {
    let config = FormatterConfig::empty()
        .with_tool_timeout_secs(7)
        .with_strategy(StrategySpec::external("shell", "sh", ["-c", "exit 0"]));

    let registry = StrategyRegistry::from_config(&config).unwrap();
    assert_eq!(registry.get("shell").unwrap().mode(), ExecutionMode::External);
    assert_eq!(registry.names().len(), 1);
}

#[test]
fn test_full_defaults_when_tools_installed() {
    let installed = ["docformatter", "autoflake"]
        .iter()
        .all(|tool| which::which(tool).is_ok());
    let result = StrategyRegistry::from_config(&FormatterConfig::default());

    if installed {
        let names: Vec<_> = result.unwrap().names().into_iter().collect();
        assert_eq!(names, vec!["autoflake", "docformatter", "pep8", "unify"]);
    } else {
        assert!(matches!(result, Err(FormatError::ToolUnavailable { .. })));
    }
}
