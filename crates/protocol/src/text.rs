//! Printable-text helpers for payload summaries

/// Display budget of a payload summary
pub const MAX_SUMMARY_LEN: usize = 40;

const ELLIPSIS: &str = "...";

/// Replace every char outside ASCII 32..=126 with `.`
pub fn sanitize_printable(input: &str) -> String {
    input
        .chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '.' })
        .collect()
}

/// Render raw bytes, replacing non-printable bytes with `.`
pub fn printable_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
        .collect()
}

/// Prefix of at most `max` chars, cut on a char boundary
pub fn truncate_chars(input: &str, max: usize) -> &str {
    match input.char_indices().nth(max) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

/// Sanitize and fit a summary into `MAX_SUMMARY_LEN` characters
///
/// Longer summaries keep their first 37 characters followed by `...`.
pub fn clean_summary(input: &str) -> String {
    let cleaned = sanitize_printable(input);
    if cleaned.len() > MAX_SUMMARY_LEN {
        let keep = MAX_SUMMARY_LEN - ELLIPSIS.len();
        format!("{}{}", &cleaned[..keep], ELLIPSIS)
    } else {
        cleaned
    }
}
