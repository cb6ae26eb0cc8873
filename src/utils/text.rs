//! Text processing utilities.

use std::sync::LazyLock;

use regex::Regex;

static RE_MULTI_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// Collapse runs of blank lines left behind by PDF/DOCX extraction.
pub fn normalize_blank_lines(text: &str) -> String {
    RE_MULTI_BLANK_LINES.replace_all(text, "\n\n").into_owned()
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
