//! In-process quote unifier
//!
//! Rewrites single-line string literals to the preferred quote character
//! when doing so needs no escaping changes. Everything else, whitespace
//! and line endings included, is left byte-for-byte.

use crate::error::FormatError;
use crate::lexer::{LineScanner, SegmentKind};
use crate::strategy::{decode_source, ExecutionMode, FormatStrategy};
use serde::{Deserialize, Serialize};

/// Registry name of the unifier
pub const UNIFY: &str = "unify";

/// Target quote character
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    /// `'text'`
    #[default]
    Single,
    /// `"text"`
    Double,
}

impl QuoteStyle {
    fn preferred(self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
        }
    }

    fn other(self) -> char {
        match self {
            Self::Single => '"',
            Self::Double => '\'',
        }
    }
}

/// Quote unifier strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuoteUnifier {
    preferred: QuoteStyle,
}

impl QuoteUnifier {
    /// Create unifier preferring `style`
    #[inline]
    #[must_use]
    pub fn new(style: QuoteStyle) -> Self {
        Self { preferred: style }
    }

    /// Preferred quote style
    #[inline]
    #[must_use]
    pub fn style(&self) -> QuoteStyle {
        self.preferred
    }

    /// Unify quotes in `source`
    #[must_use]
    pub fn unify(&self, source: &str) -> String {
        let mut scanner = LineScanner::default();
        let mut out = String::with_capacity(source.len());

        for chunk in source.split_inclusive('\n') {
            let (line, newline) = match chunk.strip_suffix('\n') {
                Some(line) => (line, "\n"),
                None => (chunk, ""),
            };
            let continued = scanner.in_string();
            for (idx, segment) in scanner.scan(line).iter().enumerate() {
                let rewritable = segment.kind == SegmentKind::Str
                    && segment.closed
                    && !(continued && idx == 0);
                match rewritable.then(|| self.requote(segment.text)).flatten() {
                    Some(requoted) => out.push_str(&requoted),
                    None => out.push_str(segment.text),
                }
            }
            out.push_str(newline);
        }
        out
    }

    /// Rewrite one closed literal, or `None` to keep it as is
    fn requote(&self, literal: &str) -> Option<String> {
        let from = self.preferred.other();
        let to = self.preferred.preferred();
        if literal.starts_with(&format!("{from}{from}{from}")) {
            return None;
        }
        let body = literal.strip_prefix(from)?.strip_suffix(from)?;
        let escaped_from = format!("\\{from}");
        if body.contains(to) || body.contains(&escaped_from) {
            return None;
        }
        Some(format!("{to}{body}{to}"))
    }
}

#[async_trait::async_trait]
impl FormatStrategy for QuoteUnifier {
    fn name(&self) -> &str {
        UNIFY
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::InProcess
    }

    async fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError> {
        let text = decode_source(UNIFY, source)?;
        Ok(self.unify(text).into_bytes())
    }
}
