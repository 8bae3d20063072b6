// Output formatting — text helpers and terminal display.

pub mod terminal;

/// The first `max_chars` characters of `text`, borrowed.
///
/// Cuts on a character boundary, so multi-byte text (emoji, Cyrillic) never
/// panics the way `&text[..n]` would.
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let prefix = prefix_chars(text, max_chars);
    if prefix.len() == text.len() {
        text.to_string()
    } else {
        format!("{prefix}...")
    }
}
