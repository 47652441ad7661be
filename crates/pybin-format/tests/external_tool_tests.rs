//! External Tool Tests
//!
//! Scratch-file invocation contract, exercised with small shell scripts
//! standing in for real formatters.

use pybin_format::{
    ExternalTool, FormatError, FormatStrategy, FormatterConfig, StrategyKind, StrategySpec,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Write `body` as a shell script; the scratch path is its last argument
fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("for last; do :; done\n{body}\n")).unwrap();
    path
}

fn tool(name: &str, script: &Path) -> ExternalTool {
    ExternalTool::locate(name, "sh", [script.display().to_string()]).unwrap()
}

/// The default `docformatter` entry, with `sh <script>` as its program
fn default_docformatter_via(script: &Path) -> StrategySpec {
    let mut spec = FormatterConfig::default()
        .strategies
        .into_iter()
        .find(|spec| spec.name == "docformatter")
        .unwrap();
    if let StrategyKind::External { program, args, .. } = &mut spec.kind {
        *program = "sh".to_string();
        args.insert(0, script.display().to_string());
    }
    spec
}

const DOCSTRING: &str = "def f():\n    \"\"\"Summary line.\n    More detail.\n    \"\"\"\n";

#[tokio::test]
async fn test_tool_rewrites_scratch_copy() {
    let dir = tempfile::tempdir().unwrap();
    let upper = script(dir.path(), "upper.sh", r#"tr a-z A-Z < "$last" > "$last.out" && mv "$last.out" "$last""#);

    let out = tool("upper", &upper).format(b"import math\n").await.unwrap();
    assert_eq!(out, b"IMPORT MATH\n");
}

#[tokio::test]
async fn test_source_is_copied_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let noop = script(dir.path(), "noop.sh", "exit 0");
    let source = "x = 1\r\n\ty = 'é'\n\n".as_bytes();

    let out = tool("noop", &noop).format(source).await.unwrap();
    assert_eq!(out, source);
}

#[tokio::test]
async fn test_nonzero_exit_is_execution_failure() {
    let dir = tempfile::tempdir().unwrap();
    let failing = script(
        dir.path(),
        "fail.sh",
        r#"echo partial > "$last"; echo "bad input" >&2; exit 3"#,
    );

    let err = tool("failing", &failing).format(b"x = 1\n").await.unwrap_err();
    match err {
        FormatError::ExecutionFailed { strategy, reason } => {
            assert_eq!(strategy, "failing");
            assert!(reason.contains("bad input"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_accepted_exit_code_returns_output() {
    let dir = tempfile::tempdir().unwrap();
    let changed = script(dir.path(), "changed.sh", r#"echo 'y = 2' > "$last"; exit 3"#);

    let out = tool("changed", &changed)
        .with_success_codes([0, 3])
        .format(b"x = 1\n")
        .await
        .unwrap();
    assert_eq!(out, b"y = 2\n");
}

#[tokio::test]
async fn test_hung_tool_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let slow = script(dir.path(), "slow.sh", "sleep 5");

    let started = Instant::now();
    let err = tool("slow", &slow)
        .with_timeout(Duration::from_millis(200))
        .format(b"x = 1\n")
        .await
        .unwrap_err();

    assert!(matches!(err, FormatError::Timeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_scratch_directory_is_private() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("seen");
    let spy = script(
        dir.path(),
        "spy.sh",
        &format!(r#"echo "$last" > "{}""#, report.display()),
    );

    tool("spy", &spy).format(b"pass\n").await.unwrap();
    tool("spy", &spy).format(b"pass\n").await.unwrap();

    let seen = PathBuf::from(std::fs::read_to_string(&report).unwrap().trim());
    assert!(!seen.starts_with(dir.path()));
    assert!(!seen.exists(), "scratch file outlived the call");
}

#[tokio::test]
async fn test_scratch_directory_removed_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("seen");
    let spy = script(
        dir.path(),
        "spy-fail.sh",
        &format!(r#"dirname "$last" > "{}"; exit 1"#, report.display()),
    );

    let err = tool("spy", &spy).format(b"pass\n").await.unwrap_err();
    assert!(matches!(err, FormatError::ExecutionFailed { .. }));

    let scratch_dir = PathBuf::from(std::fs::read_to_string(&report).unwrap().trim());
    assert!(!scratch_dir.exists(), "scratch directory outlived a failed call");
}

#[tokio::test]
async fn test_default_docformatter_accepts_exit_three() {
    let dir = tempfile::tempdir().unwrap();
    // docformatter exits 3 after rewriting a file in place
    let stub = script(
        dir.path(),
        "docformatter.sh",
        r#"case "$*" in *--pre-summary-newline*--in-place*) ;; *) exit 9 ;; esac
awk '{ print } /Summary line/ { print "" }' "$last" > "$last.new" && mv "$last.new" "$last"
exit 3"#,
    );

    let strategy = default_docformatter_via(&stub).build(None).unwrap();
    let out = strategy.format(DOCSTRING.as_bytes()).await.unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "def f():\n    \"\"\"Summary line.\n\n    More detail.\n    \"\"\"\n"
    );
}

#[tokio::test]
async fn test_default_docformatter_rejects_real_failure() {
    let dir = tempfile::tempdir().unwrap();
    let stub = script(
        dir.path(),
        "docformatter.sh",
        r#"echo "cannot parse" >&2; exit 1"#,
    );

    let strategy = default_docformatter_via(&stub).build(None).unwrap();
    let err = strategy.format(DOCSTRING.as_bytes()).await.unwrap_err();
    assert!(matches!(err, FormatError::ExecutionFailed { .. }), "{err}");
}

#[tokio::test]
#[ignore = "requires autoflake"]
async fn test_autoflake_strips_unused_import() {
    let strategy = FormatterConfig::default()
        .retain(|name| name == "autoflake")
        .build_strategies()
        .unwrap()
        .remove(0);

    assert_eq!(strategy.format(b"import math").await.unwrap(), b"");
}

#[tokio::test]
#[ignore = "requires docformatter"]
async fn test_docformatter_adds_blank_line_after_summary() {
    let strategy = FormatterConfig::default()
        .retain(|name| name == "docformatter")
        .build_strategies()
        .unwrap()
        .remove(0);

    let out = String::from_utf8(strategy.format(DOCSTRING.as_bytes()).await.unwrap()).unwrap();
    assert!(out.contains("Summary line.\n\n"), "{out}");
    assert!(out.contains("More detail."), "{out}");
}
