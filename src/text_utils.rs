/*!
 * Character-level text helpers.
 *
 * The aligner treats text as opaque: lengths and offsets are counted in
 * Unicode scalar values, and the only classification it needs is whether a
 * character is punctuation or spacing.
 */

use once_cell::sync::Lazy;
use regex::Regex;

// @const: Punctuation, separators and whitespace
static PUNCTUATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{P}\p{Z}\s]").unwrap()
});

/// Number of characters in `text`
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` after `offset` characters.
///
/// Offsets past the end return the whole text and an empty remainder.
pub fn split_at_char(text: &str, offset: usize) -> (&str, &str) {
    match text.char_indices().nth(offset) {
        Some((byte_index, _)) => text.split_at(byte_index),
        None => (text, ""),
    }
}

/// Whether `text` contains any punctuation or whitespace character
pub fn has_punctuation(text: &str) -> bool {
    PUNCTUATION_REGEX.is_match(text)
}

/// Remove every punctuation and whitespace character from `text`
pub fn strip_punctuation(text: &str) -> String {
    PUNCTUATION_REGEX.replace_all(text, "").into_owned()
}

/// Concatenate texts without a separator.
///
/// Character offsets into the result map directly onto the inputs.
pub fn concat_texts<'a, I>(texts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    texts.into_iter().collect()
}

/// Shorten text for log lines
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if char_len(text) <= max_chars {
        text.to_string()
    } else {
        format!("{}...", split_at_char(text, max_chars).0)
    }
}
