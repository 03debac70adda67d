//! Diacritics-insensitive text matching shared by the track selectors.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Decomposes `text`, strips combining marks and lower-cases the result.
///
/// `"Québécois"` becomes `"quebecois"`, `"FORCÉ"` becomes `"force"`. Keyword lists are
/// written in this form so a plain substring test is enough afterwards.
pub fn normalize(text: &str) -> String {
    let folded: String = strip_marks(text).flat_map(char::to_lowercase).collect();

    // Lower-casing can reintroduce combining marks (U+0130 -> "i\u{307}").
    strip_marks(&folded).collect()
}

fn strip_marks(text: &str) -> impl Iterator<Item = char> + '_ {
    text.nfkd().filter(|c| !is_combining_mark(*c))
}

/// Returns true if the already-normalized `haystack` contains any of `keywords`.
pub fn contains_any<S: AsRef<str>>(haystack: &str, keywords: &[S]) -> bool {
    keywords
        .iter()
        .any(|k| !k.as_ref().is_empty() && haystack.contains(k.as_ref()))
}

/// Returns true if `keyword` is already in normalized form.
pub fn is_normalized(keyword: &str) -> bool {
    normalize(keyword) == keyword
}
