//! Whitespace cleanup passes for extracted page text.
//!
//! Extracted text keeps the source document's indentation and the runs of
//! spaces left where inline elements were dropped. Runs of two or more
//! spaces are treated as phrase delimiters.

use std::sync::LazyLock;

use regex::Regex;

/// Clean raw extracted text into one phrase per line.
pub(crate) fn clean_text(text: &str) -> String {
    split_lines(text)
        .map(str::trim)
        .flat_map(split_phrases)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split on every Unicode line boundary, not only `\n` and `\r\n`.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_line_boundary)
}

fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}'
            | '\u{2029}'
    )
}

/// Split a trimmed line on runs of two or more spaces.
fn split_phrases(line: &str) -> impl Iterator<Item = &str> {
    static PHRASE_BREAK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));

    PHRASE_BREAK_RE.split(line).map(str::trim)
}
