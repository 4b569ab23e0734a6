/// Cut `s` to at most `max_chars` characters, appending `marker` when anything
/// was removed. Character counts are Unicode scalar values, never bytes.
#[must_use]
pub fn truncate_with_marker(s: &str, max_chars: usize, marker: &str) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{marker}", &s[..idx]),
        None => s.to_string(),
    }
}

/// Length of `s` in Unicode scalar values.
#[must_use]
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
