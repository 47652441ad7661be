//! Line-oriented Python lexing
//!
//! Just enough tokenisation for whitespace and quote rewriting: every
//! physical line is split into code, string literal and comment segments.
//! String prefixes (`r`, `b`, `f`, `u`) stay in the preceding code segment;
//! a string segment always starts at its opening quote.

/// Segment classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    Code,
    Str,
    Comment,
}

/// Slice of one physical line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub(crate) kind: SegmentKind,
    pub(crate) text: &'a str,
    /// For strings: the closing quote is on this line
    pub(crate) closed: bool,
}

impl<'a> Segment<'a> {
    fn code(text: &'a str) -> Self {
        Self {
            kind: SegmentKind::Code,
            text,
            closed: true,
        }
    }

    fn string(text: &'a str, closed: bool) -> Self {
        Self {
            kind: SegmentKind::Str,
            text,
            closed,
        }
    }

    fn comment(text: &'a str) -> Self {
        Self {
            kind: SegmentKind::Comment,
            text,
            closed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Quote {
    ch: u8,
    triple: bool,
}

/// Stateful scanner fed one physical line at a time
///
/// Carries open triple-quoted strings and bracket depth across lines.
#[derive(Debug, Default, Clone)]
pub(crate) struct LineScanner {
    open: Option<Quote>,
    depth: usize,
}

impl LineScanner {
    /// The next line starts inside a string literal
    pub(crate) fn in_string(&self) -> bool {
        self.open.is_some()
    }

    /// Open bracket count after the last scanned line
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Split `line` (without its newline) into segments
    pub(crate) fn scan<'a>(&mut self, line: &'a str) -> Vec<Segment<'a>> {
        let bytes = line.as_bytes();
        let mut segments = Vec::new();
        let mut i = 0;

        if let Some(quote) = self.open.take() {
            match find_string_end(bytes, 0, quote) {
                Some(end) => {
                    segments.push(Segment::string(&line[..end], true));
                    i = end;
                }
                None => {
                    segments.push(Segment::string(line, false));
                    if quote.triple || line.ends_with('\\') {
                        self.open = Some(quote);
                    }
                    return segments;
                }
            }
        }

        let mut start = i;
        while i < bytes.len() {
            match bytes[i] {
                b'#' => {
                    push_code(&mut segments, &line[start..i]);
                    segments.push(Segment::comment(&line[i..]));
                    return segments;
                }
                q @ (b'\'' | b'"') => {
                    push_code(&mut segments, &line[start..i]);
                    let triple = bytes[i..].starts_with(&[q, q, q]);
                    let quote = Quote { ch: q, triple };
                    let body = i + if triple { 3 } else { 1 };
                    match find_string_end(bytes, body, quote) {
                        Some(end) => {
                            segments.push(Segment::string(&line[i..end], true));
                            i = end;
                            start = i;
                            continue;
                        }
                        None => {
                            segments.push(Segment::string(&line[i..], false));
                            if triple || line.ends_with('\\') {
                                self.open = Some(quote);
                            }
                            return segments;
                        }
                    }
                }
                b'(' | b'[' | b'{' => self.depth += 1,
                b')' | b']' | b'}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
            i += 1;
        }

        push_code(&mut segments, &line[start..]);
        segments
    }
}

fn push_code<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::code(text));
    }
}

/// Index just past the closing quote, searching from `from`
fn find_string_end(bytes: &[u8], from: usize, quote: Quote) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            c if c == quote.ch => {
                if !quote.triple {
                    return Some(i + 1);
                }
                if bytes[i..].starts_with(&[c, c, c]) {
                    return Some(i + 3);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}
