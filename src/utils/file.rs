//! File name utilities for stored uploads.

/// Final path component of a client-supplied file name.
///
/// Browsers may send either separator, so both are stripped.
pub fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Sanitize a filename by replacing invalid characters.
///
/// Replaces characters that are not allowed in filenames on common operating
/// systems (Windows, macOS, Linux) with hyphens. Leading dots are dropped so
/// the result can never name a hidden file or a parent directory.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = base_name(name)
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect::<String>();

    let cleaned = cleaned.trim_matches('-').trim_start_matches('.').trim();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
