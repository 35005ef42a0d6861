//! Source-line cleaning and compiled-region selection.
//!
//! A program is read whole, split into lines, stripped of `;` comments and
//! surrounding whitespace, and filtered down to the non-empty lines. Line
//! numbers and the column of the first kept character survive cleaning so
//! diagnostics can point back into the file.

/// Comment introducer. Everything from here to the end of the line is dropped.
pub const COMMENT_BYTE: u8 = b';';

/// One non-empty line after cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine<'src> {
    /// 1-based line number in the file.
    pub number: u32,
    /// 1-based column of `text` within the raw line.
    pub column: u32,
    /// The cleaned text: comment removed, trimmed on both sides.
    pub text: &'src str,
}

/// Cleans a single raw line. Returns the kept text and its byte offset in
/// `raw`, or `None` if nothing is left.
pub fn clean_line(raw: &str) -> Option<(usize, &str)> {
    let code = match memchr::memchr(COMMENT_BYTE, raw.as_bytes()) {
        Some(offset) => &raw[..offset],
        None => raw,
    };
    let trimmed_end = code.trim_end();
    let text = trimmed_end.trim_start();
    if text.is_empty() {
        return None;
    }
    Some((trimmed_end.len() - text.len(), text))
}

/// Cleans every line of `source`, dropping the ones left empty.
pub fn clean(source: &str) -> Vec<SourceLine<'_>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            clean_line(raw).map(|(offset, text)| SourceLine {
                number: idx as u32 + 1,
                column: offset as u32 + 1,
                text,
            })
        })
        .collect()
}

/// The lines strictly between the first `start` marker line and the first
/// following `end` marker line. Without an `end` marker the region runs to
/// the end of the file. Returns `None` when there is no `start` marker.
pub fn region<'a, 'src>(
    lines: &'a [SourceLine<'src>],
    start: &str,
    end: &str,
) -> Option<&'a [SourceLine<'src>]> {
    let first = lines.iter().position(|line| line.text == start)? + 1;
    let rest = &lines[first..];
    let len = rest
        .iter()
        .position(|line| line.text == end)
        .unwrap_or(rest.len());
    Some(&rest[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_whitespace() {
        assert_eq!(clean_line("  x = 1 ; set x  "), Some((2, "x = 1")));
        assert_eq!(clean_line("; only a comment"), None);
        assert_eq!(clean_line("   \t"), None);
        assert_eq!(clean_line("RES x"), Some((0, "RES x")));
    }

    #[test]
    fn keeps_line_numbers_of_surviving_lines() {
        let lines = clean("INICIO\n\n  ; note\n  a = 2\nFIM\n");
        let numbered: Vec<(u32, u32, &str)> =
            lines.iter().map(|l| (l.number, l.column, l.text)).collect();
        assert_eq!(
            numbered,
            vec![(1, 1, "INICIO"), (4, 3, "a = 2"), (5, 1, "FIM")]
        );
    }

    #[test]
    fn region_between_markers() {
        let lines = clean("junk = 1\nINICIO\na = 1\nFIM\nb = 2\n");
        let body = region(&lines, "INICIO", "FIM").unwrap();
        let texts: Vec<&str> = body.iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["a = 1"]);
    }

    #[test]
    fn region_without_end_marker_runs_to_eof() {
        let lines = clean("INICIO\na = 1\nb = 2\n");
        let body = region(&lines, "INICIO", "FIM").unwrap();
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn region_requires_start_marker() {
        let lines = clean("a = 1\nFIM\n");
        assert!(region(&lines, "INICIO", "FIM").is_none());
    }
}
