//! Long line splitting at bracket and comma boundaries

use crate::lexer::{LineScanner, SegmentKind};

/// PEP 8 maximum line length
pub(crate) const MAX_LINE_LENGTH: usize = 79;

const HANGING_INDENT: usize = 4;

fn width(text: &str) -> usize {
    text.chars().count()
}

/// First top-level bracket pair of a line, cut into pieces
#[derive(Debug)]
struct Split<'a> {
    /// Text up to and including the opening bracket
    head: &'a str,
    /// Comma-terminated items, the last one carrying the closing bracket
    /// and everything after it
    pieces: Vec<String>,
}

impl<'a> Split<'a> {
    /// Locate the bracket pair to break inside
    ///
    /// Prefers the first pair holding a top-level comma, falling back to
    /// the first non-empty pair.
    fn find(body: &'a str) -> Option<Self> {
        let mut scanner = LineScanner::default();
        let mut offset = 0;
        let mut depth = 0usize;
        let mut open = 0;
        let mut commas = Vec::new();
        let mut with_commas = None;
        let mut non_empty = None;

        for segment in scanner.scan(body) {
            match segment.kind {
                SegmentKind::Comment => return None,
                SegmentKind::Str => {}
                SegmentKind::Code => {
                    for (idx, byte) in segment.text.bytes().enumerate() {
                        let at = offset + idx;
                        match byte {
                            b'(' | b'[' | b'{' => {
                                if depth == 0 {
                                    open = at;
                                    commas.clear();
                                }
                                depth += 1;
                            }
                            b')' | b']' | b'}' if depth > 0 => {
                                depth -= 1;
                                if depth == 0 {
                                    let pair = (open, at, commas.clone());
                                    if !commas.is_empty() && with_commas.is_none() {
                                        with_commas = Some(pair);
                                    } else if !body[open + 1..at].trim().is_empty()
                                        && non_empty.is_none()
                                    {
                                        non_empty = Some(pair);
                                    }
                                }
                            }
                            b',' if depth == 1 => commas.push(at),
                            _ => {}
                        }
                    }
                }
            }
            offset += segment.text.len();
        }

        let (open, close, commas) = with_commas.or(non_empty)?;
        let mut pieces: Vec<String> = Vec::with_capacity(commas.len() + 1);
        let mut start = open + 1;
        for comma in commas {
            pieces.push(body[start..=comma].trim().to_string());
            start = comma + 1;
        }
        let last = body[start..close].trim();
        let tail = body[close..].trim_end();
        match pieces.last_mut() {
            // Trailing comma: the closing bracket joins the final item
            Some(previous) if last.is_empty() => previous.push_str(tail),
            _ => pieces.push(format!("{last}{tail}")),
        }

        Some(Self {
            head: body[..=open].trim_end(),
            pieces,
        })
    }

    /// Lay the pieces out greedily, continuation lines starting at `column`
    fn layout(&self, indent: usize, column: usize, max: usize, hanging: bool) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = format!("{}{}", " ".repeat(indent), self.head);
        let mut empty = true;
        if hanging {
            lines.push(current);
            current = " ".repeat(column);
        }

        for piece in &self.pieces {
            if !empty && width(&current) + 1 + width(piece) > max {
                lines.push(std::mem::replace(&mut current, " ".repeat(column)));
                empty = true;
            }
            if !empty {
                current.push(' ');
            }
            current.push_str(piece);
            empty = false;
        }
        lines.push(current);
        lines
    }
}

/// Break `body` (indented by `indent`) into lines no wider than `max`
///
/// Returns `None` when the line already fits or cannot be improved.
pub(crate) fn wrap_line(
    body: &str,
    indent: usize,
    max: usize,
    opens_block: bool,
) -> Option<Vec<String>> {
    let original = indent + width(body);
    if original <= max {
        return None;
    }
    let split = Split::find(body)?;

    let aligned = split.layout(indent, indent + width(split.head), max, false);
    if aligned.len() > 1 && aligned.iter().all(|line| width(line) <= max) {
        return Some(aligned);
    }

    let levels = if opens_block { 2 } else { 1 };
    let hanging = split.layout(indent, indent + HANGING_INDENT * levels, max, true);
    let longest = hanging.iter().map(|line| width(line)).max()?;
    (longest < original).then_some(hanging)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_lines_are_left_alone() {
        assert_eq!(wrap_line("x = f(a, b)", 0, MAX_LINE_LENGTH, false), None);
    }

    #[test]
    fn aligns_with_opening_bracket() {
        let lines = wrap_line("total = compute(alpha, beta, gamma, delta)", 0, 30, false).unwrap();
        assert_eq!(
            lines,
            vec![
                "total = compute(alpha, beta,",
                "                gamma, delta)",
            ]
        );
    }

    #[test]
    fn hangs_when_alignment_does_not_fit() {
        let lines = wrap_line("value = function_name(first_item, second)", 4, 30, false).unwrap();
        assert_eq!(
            lines,
            vec![
                "    value = function_name(",
                "        first_item, second)",
            ]
        );
    }

    #[test]
    fn block_openers_hang_twice_as_deep() {
        let lines = wrap_line("if some_check(first_item, second):", 0, 24, true).unwrap();
        assert_eq!(
            lines,
            vec!["if some_check(", "        first_item,", "        second):"]
        );
    }

    #[test]
    fn trailing_comma_keeps_bracket_on_last_item() {
        let lines = wrap_line("xs = [one, two, three,]", 0, 16, false).unwrap();
        assert_eq!(lines, vec!["xs = [one, two,", "      three,]"]);
    }

    #[test]
    fn commas_inside_strings_are_not_split_points() {
        let lines = wrap_line("s = g('a, b, c, d, e, f')", 0, 10, false).unwrap();
        assert_eq!(lines, vec!["s = g(", "    'a, b, c, d, e, f')"]);
    }

    #[test]
    fn lines_with_comments_stay_long() {
        assert_eq!(wrap_line("x = f(a, b)  # why", 0, 10, false), None);
    }

    #[test]
    fn lines_without_brackets_stay_long() {
        assert_eq!(wrap_line("x = aaaaaaaaaaaa + bbbbbbbbbbbb", 0, 10, false), None);
    }
}
