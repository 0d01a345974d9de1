//! Session title derivation.
//!
//! Titles are derived once, from the message that opens the session:
//! the first `max_chars` characters, plus a truncation marker when cut.

use spendscope_types::chat::TITLE_TRUNCATION_MARKER;

/// Derive a session title from the first user message.
///
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn derive_title(first_message: &str, max_chars: usize) -> String {
    match first_message.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TITLE_TRUNCATION_MARKER}", &first_message[..cut]),
        None => first_message.to_string(),
    }
}
