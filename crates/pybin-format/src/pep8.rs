//! In-process PEP 8 whitespace and line-length fixer
//!
//! Rewrites layout only: indentation, token spacing, comment spacing, blank
//! lines and over-long bracketed lines. String literals are never touched
//! and lines inside multi-line strings are copied verbatim.

use crate::error::FormatError;
use crate::lexer::{LineScanner, Segment, SegmentKind};
use crate::strategy::{decode_source, ExecutionMode, FormatStrategy};
use crate::wrap::{wrap_line, MAX_LINE_LENGTH};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Registry name of the fixer
pub const PEP8: &str = "pep8";

const INDENT_WIDTH: usize = 4;
const MAX_BLANK_LINES: usize = 2;

static EQ_NONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*==\s*None\b").expect("valid regex"));
static NE_NONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*!=\s*None\b").expect("valid regex"));

/// Longest first, so prefixes never shadow a longer operator
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "->", ":=", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=", "**", "//", "<<", ">>", "<", ">", "=", "+", "-", "*", "/", "%", "&",
    "|", "^", "~", "@",
];

/// Operators written with exactly one space on each side
const SPACED_OPERATORS: &[&str] = &[
    "=", "==", "!=", "<", ">", "<=", ">=", "->", ":=", "+=", "-=", "*=", "/=", "//=", "%=", "**=",
    "&=", "|=", "^=", "@=", ">>=", "<<=",
];

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// PEP 8 layout fixer
///
/// # Example
///
/// ```rust
/// use pybin_format::Pep8Fixer;
///
/// let fixer = Pep8Fixer::new();
/// assert_eq!(fixer.fix("   a    =   b   +   c   "), "a = b + c\n");
/// assert_eq!(fixer.fix("if x == None :\n  y=[ 1,2 ]"), "if x is None:\n    y = [1, 2]\n");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pep8Fixer {
    aggressive: bool,
    max_line_length: usize,
}

impl Default for Pep8Fixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Pep8Fixer {
    /// Create fixer with aggressive mode enabled and 79 column lines
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            aggressive: true,
            max_line_length: MAX_LINE_LENGTH,
        }
    }

    /// Toggle aggressive rewrites (`== None` → `is None`)
    #[inline]
    #[must_use]
    pub fn aggressive(mut self, aggressive: bool) -> Self {
        self.aggressive = aggressive;
        self
    }

    /// Override the column limit used when breaking long lines
    #[inline]
    #[must_use]
    pub fn with_max_line_length(mut self, columns: usize) -> Self {
        self.max_line_length = columns;
        self
    }

    /// Whether aggressive rewrites are enabled
    #[inline]
    #[must_use]
    pub fn is_aggressive(&self) -> bool {
        self.aggressive
    }

    /// Column limit for long lines
    #[inline]
    #[must_use]
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Fix `source`, returning the rewritten text
    #[must_use]
    pub fn fix(&self, source: &str) -> String {
        let normalized = source.replace("\r\n", "\n");
        let mut scanner = LineScanner::default();
        let mut state = IndentState::default();
        let mut spacing = Spacing::default();
        let mut lines: Vec<String> = Vec::new();
        let mut blank_run = 0;

        for raw in normalized.split('\n') {
            let began_in_string = scanner.in_string();
            let continuation = scanner.depth() > 0 || state.backslash;

            if began_in_string {
                let segments = scanner.scan(raw);
                let line = if scanner.in_string() {
                    raw.to_string()
                } else {
                    self.render_body(&segments, true, &mut spacing)
                };
                state.observe(&segments, &scanner);
                blank_run = 0;
                lines.push(line);
                continue;
            }

            if !continuation {
                spacing.reset();
            }
            let (width, body) = split_indent(raw);
            let segments = scanner.scan(body);
            let line = self.render_body(&segments, false, &mut spacing);

            if line.is_empty() {
                blank_run += 1;
                if blank_run <= MAX_BLANK_LINES {
                    lines.push(String::new());
                }
                state.backslash = false;
                continue;
            }
            blank_run = 0;

            let comment_only = segments.iter().all(|s| s.kind == SegmentKind::Comment);
            let indent = if continuation {
                state.shifted(width)
            } else if comment_only {
                state.comment_indent(width)
            } else {
                state.begin_logical(width)
            };
            if comment_only {
                lines.push(format!("{}{line}", " ".repeat(indent)));
                continue;
            }

            state.observe(&segments, &scanner);
            let single_line = !continuation && state.at_logical_end(&scanner);
            match single_line
                .then(|| wrap_line(&line, indent, self.max_line_length, state.prev_opens_block))
                .flatten()
            {
                Some(wrapped) => lines.extend(wrapped),
                None => lines.push(format!("{}{line}", " ".repeat(indent))),
            }
        }

        while lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        if lines.is_empty() {
            return String::new();
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    fn render_body(
        &self,
        segments: &[Segment<'_>],
        began_in_string: bool,
        spacing: &mut Spacing,
    ) -> String {
        let texts: Vec<Cow<'_, str>> = segments
            .iter()
            .map(|segment| match segment.kind {
                SegmentKind::Code => self.rewrite_code(segment.text),
                _ => Cow::Borrowed(segment.text),
            })
            .collect();

        let mut builder = LineBuilder::default();
        let mut tokens = Vec::new();
        let mut pending_space = false;
        let mut comment = None;
        for (idx, (segment, text)) in segments.iter().zip(&texts).enumerate() {
            match segment.kind {
                SegmentKind::Code => tokenize(text, &mut pending_space, &mut tokens),
                SegmentKind::Str if idx == 0 && began_in_string => {
                    builder.push_verbatim(text, spacing);
                }
                SegmentKind::Str => {
                    tokens.push(Token {
                        kind: TokenKind::Str,
                        text,
                        space_before: pending_space,
                    });
                    pending_space = false;
                    builder.open_tail = !segment.closed;
                }
                SegmentKind::Comment => comment = Some(segment.text),
            }
        }

        builder.push_tokens(&tokens, spacing);
        if let Some(comment) = comment {
            builder.push_comment(comment);
        }
        builder.finish()
    }

    fn rewrite_code<'a>(&self, code: &'a str) -> Cow<'a, str> {
        if !self.aggressive || !code.contains("None") {
            return Cow::Borrowed(code);
        }
        let code = EQ_NONE.replace_all(code, " is None");
        Cow::Owned(NE_NONE.replace_all(&code, " is not None").into_owned())
    }
}

#[async_trait::async_trait]
impl FormatStrategy for Pep8Fixer {
    fn name(&self) -> &str {
        PEP8
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::InProcess
    }

    async fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError> {
        let text = decode_source(PEP8, source)?;
        Ok(self.fix(text).into_bytes())
    }
}

/// One block level: indentation as written and as rewritten
#[derive(Debug, Clone, Copy, Default)]
struct Level {
    source: usize,
    fixed: usize,
}

/// Indentation of the surrounding logical lines
#[derive(Debug, Default)]
struct IndentState {
    /// Open blocks, innermost last; column 0 is implicit
    levels: Vec<Level>,
    /// Start of the current logical line
    start: Level,
    prev_opens_block: bool,
    last_code_char: Option<char>,
    backslash: bool,
}

impl IndentState {
    fn top(&self) -> Level {
        self.levels.last().copied().unwrap_or_default()
    }

    /// Map the start of a logical line onto 4-space block levels
    ///
    /// Deeper indentation that does not follow a `:` is unexpected and
    /// clamped back to the enclosing level.
    fn begin_logical(&mut self, width: usize) -> usize {
        let top = self.top();
        let fixed = if width > top.source {
            if self.prev_opens_block {
                let fixed = top.fixed + INDENT_WIDTH;
                self.levels.push(Level {
                    source: width,
                    fixed,
                });
                fixed
            } else {
                top.fixed
            }
        } else {
            while self.levels.last().is_some_and(|level| level.source > width) {
                self.levels.pop();
            }
            self.top().fixed
        };
        self.start = Level {
            source: width,
            fixed,
        };
        self.last_code_char = None;
        fixed
    }

    /// Comments follow the code level they sit in without opening one
    fn comment_indent(&self, width: usize) -> usize {
        let top = self.top();
        if width > top.source {
            top.fixed + if self.prev_opens_block { INDENT_WIDTH } else { 0 }
        } else {
            self.levels
                .iter()
                .rev()
                .find(|level| level.source <= width)
                .map_or(0, |level| level.fixed)
        }
    }

    /// Continuation lines move by the same amount as their logical line
    fn shifted(&self, width: usize) -> usize {
        (width + self.start.fixed).saturating_sub(self.start.source)
    }

    fn at_logical_end(&self, scanner: &LineScanner) -> bool {
        scanner.depth() == 0 && !scanner.in_string() && !self.backslash
    }

    /// Record the tail of a non-blank physical line
    fn observe(&mut self, segments: &[Segment<'_>], scanner: &LineScanner) {
        if let Some(last) = segments
            .iter()
            .rev()
            .find(|s| s.kind == SegmentKind::Code)
            .and_then(|s| s.text.trim_end().chars().last())
        {
            self.last_code_char = Some(last);
        }
        self.backslash = segments
            .last()
            .is_some_and(|s| s.kind == SegmentKind::Code && s.text.trim_end().ends_with('\\'));
        if self.at_logical_end(scanner) {
            self.prev_opens_block = self.last_code_char == Some(':');
        }
    }
}

/// Split leading whitespace off `line`, returning its width with tabs expanded
fn split_indent(line: &str) -> (usize, &str) {
    let mut width = 0;
    for (idx, ch) in line.char_indices() {
        match ch {
            ' ' => width += 1,
            '\t' => width += INDENT_WIDTH - width % INDENT_WIDTH,
            _ => return (width, &line[idx..]),
        }
    }
    (width, "")
}

/// Normalise `#comment` to `# comment`
fn normalize_comment(comment: &str) -> Cow<'_, str> {
    let comment = comment.trim_end();
    let rest = &comment[1..];
    if rest.is_empty() || rest.starts_with([' ', '#', '!', ':']) {
        Cow::Borrowed(comment)
    } else {
        Cow::Owned(format!("# {rest}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    /// Identifier or number
    Word,
    Keyword,
    Str,
    Open,
    Close,
    /// `,` or `;`
    Separator,
    Colon,
    Dot,
    Operator,
    Other,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    /// Whitespace preceded the token in the source
    space_before: bool,
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

fn is_ident_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Length of the numeric literal at the start of `rest`
fn number_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let radix_prefix = bytes.len() > 1
        && bytes[0] == b'0'
        && matches!(bytes[1], b'x' | b'X' | b'o' | b'O' | b'b' | b'B');
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' => i += 1,
            b'+' | b'-' if !radix_prefix && i > 0 && matches!(bytes[i - 1], b'e' | b'E') => i += 1,
            _ => break,
        }
    }
    i
}

/// Split one code segment into tokens
///
/// `pending_space` carries trailing whitespace over to the next segment.
fn tokenize<'a>(code: &'a str, pending_space: &mut bool, out: &mut Vec<Token<'a>>) {
    let mut i = 0;
    while let Some(ch) = code[i..].chars().next() {
        let rest = &code[i..];
        if ch.is_whitespace() {
            *pending_space = true;
            i += ch.len_utf8();
            continue;
        }

        let starts_number = ch.is_ascii_digit()
            || (ch == '.' && rest[1..].starts_with(|c: char| c.is_ascii_digit()));
        let (kind, len) = if starts_number {
            (TokenKind::Word, number_len(rest))
        } else if is_ident_start(ch) {
            let len = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
            let kind = if KEYWORDS.contains(&&rest[..len]) {
                TokenKind::Keyword
            } else {
                TokenKind::Word
            };
            (kind, len)
        } else if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            (TokenKind::Operator, op.len())
        } else {
            let kind = match ch {
                '(' | '[' | '{' => TokenKind::Open,
                ')' | ']' | '}' => TokenKind::Close,
                ',' | ';' => TokenKind::Separator,
                ':' => TokenKind::Colon,
                '.' => TokenKind::Dot,
                _ => TokenKind::Other,
            };
            (kind, ch.len_utf8())
        };

        out.push(Token {
            kind,
            text: &rest[..len],
            space_before: *pending_space,
        });
        *pending_space = false;
        i += len;
    }
}

/// Bracket nesting frame
#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    bracket: Option<char>,
    /// A parameter annotation (`name: type`) is open
    annotated: bool,
    /// Inside a lambda's parameter list
    lambda: bool,
}

/// Spacing requirements left by the last emitted token
#[derive(Debug, Clone, Copy)]
struct Emitted {
    kind: TokenKind,
    tight_after: bool,
    spaced_after: bool,
}

/// Token context carried across the physical lines of a logical line
#[derive(Debug, Default)]
struct Spacing {
    frames: Vec<Frame>,
    prev: Option<Emitted>,
}

impl Spacing {
    fn reset(&mut self) {
        self.frames.clear();
        self.prev = None;
    }

    fn frame(&mut self) -> &mut Frame {
        if self.frames.is_empty() {
            self.frames.push(Frame::default());
        }
        let innermost = self.frames.len() - 1;
        &mut self.frames[innermost]
    }
}

fn is_unary(op: &str, prev: Option<Emitted>) -> bool {
    let after_operand = prev.is_some_and(|p| {
        !matches!(
            p.kind,
            TokenKind::Operator
                | TokenKind::Open
                | TokenKind::Separator
                | TokenKind::Colon
                | TokenKind::Keyword
        )
    });
    match op {
        "~" => true,
        "-" | "+" | "*" | "**" => !after_operand,
        "@" => prev.is_none(),
        _ => false,
    }
}

/// Accumulates one line's body with normalised spacing
#[derive(Debug, Default)]
struct LineBuilder {
    out: String,
    open_tail: bool,
}

impl LineBuilder {
    fn push_tokens(&mut self, tokens: &[Token<'_>], spacing: &mut Spacing) {
        for (idx, token) in tokens.iter().enumerate() {
            let next_space = tokens.get(idx + 1).is_some_and(|next| next.space_before);
            self.push_token(*token, next_space, spacing);
        }
    }

    fn push_token(&mut self, token: Token<'_>, next_space: bool, spacing: &mut Spacing) {
        use TokenKind::{Close, Colon, Dot, Keyword, Open, Operator, Separator, Str, Word};

        let prev = spacing.prev;
        let frame = *spacing.frame();
        let operator = token.kind == Operator;
        let unary = operator && is_unary(token.text, prev);
        let keyword_eq = operator
            && token.text == "="
            && ((frame.bracket == Some('(') && !frame.annotated) || frame.lambda);
        let spaced = operator && !unary && !keyword_eq && SPACED_OPERATORS.contains(&token.text);
        let balanced = token.space_before || next_space;
        let slice = token.kind == Colon && frame.bracket == Some('[') && !frame.lambda;

        let space = match prev {
            _ if self.out.is_empty() => false,
            None => token.space_before,
            Some(_) if matches!(token.kind, Close | Separator | Colon) => false,
            Some(p) if token.kind == Keyword && p.kind == Dot => true,
            Some(p) if p.tight_after => false,
            Some(_) if keyword_eq => false,
            Some(_) if spaced => true,
            Some(p) if p.spaced_after => true,
            Some(_) if token.kind == Keyword => true,
            Some(_) if operator && !unary => balanced,
            Some(p) if token.kind == Open && matches!(p.kind, Word | Str | Close) => false,
            Some(_) if token.kind == Dot => false,
            Some(_) => token.space_before,
        };
        if space {
            self.out.push(' ');
        }
        self.out.push_str(token.text);

        let (tight_after, spaced_after) = match token.kind {
            Open | Dot => (true, false),
            Separator | Keyword => (false, true),
            Colon => (slice, !slice),
            Operator if unary || keyword_eq => (true, false),
            Operator if spaced => (false, true),
            Operator => (!balanced, balanced),
            _ => (false, false),
        };
        spacing.prev = Some(Emitted {
            kind: token.kind,
            tight_after,
            spaced_after,
        });

        match token.kind {
            Open => spacing.frames.push(Frame {
                bracket: token.text.chars().next(),
                ..Frame::default()
            }),
            Close => {
                if spacing.frames.len() > 1 {
                    spacing.frames.pop();
                }
            }
            Separator => spacing.frame().annotated = false,
            Colon => {
                let frame = spacing.frame();
                if frame.lambda {
                    frame.lambda = false;
                } else if frame.bracket == Some('(') {
                    frame.annotated = true;
                }
            }
            Keyword if token.text == "lambda" => spacing.frame().lambda = true,
            _ => {}
        }
    }

    fn push_verbatim(&mut self, text: &str, spacing: &mut Spacing) {
        self.out.push_str(text);
        spacing.prev = Some(Emitted {
            kind: TokenKind::Str,
            tight_after: false,
            spaced_after: false,
        });
    }

    fn push_comment(&mut self, comment: &str) {
        if !self.out.is_empty() {
            self.out.push_str("  ");
        }
        self.out.push_str(&normalize_comment(comment));
    }

    fn finish(self) -> String {
        if self.open_tail {
            self.out
        } else {
            self.out.trim_end().to_string()
        }
    }
}
