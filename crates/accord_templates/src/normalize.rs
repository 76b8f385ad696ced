//! Name normalization used to match type names against template files.
//!
//! Three forms are derived from any name:
//! - `slug`: lowercase, accents stripped, non-alphanumeric runs collapsed to `-`
//! - `clean_slug`: `slug` without Spanish stop-words
//! - `compact`: alphanumerics only

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Closed set of stop-words removed by [`clean_slug`].
pub const STOP_WORDS: &[&str] = &[
    "de", "del", "la", "el", "en", "con", "por", "para", "y", "o", "a", "un", "una",
];

/// Leading tokens naming the agreement kind rather than the agreement itself.
pub const KIND_TOKENS: &[&str] = &["convenio", "acuerdo"];

/// Shortest compact qualifier worth matching on its own; shorter ones are
/// contained in almost any file name.
pub const MIN_QUALIFIER_LEN: usize = 3;

/// Lowercase, strip accents, collapse non `[a-z0-9]` runs to one hyphen, trim hyphens.
pub fn slug(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for ch in lowered.nfd().filter(|c| !is_combining_mark(*c)) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    out
}

/// [`slug`] with [`STOP_WORDS`] removed as whole tokens.
pub fn clean_slug(raw: &str) -> String {
    strip_stop_words(&slug(raw))
}

/// Remove stop-word tokens from an existing slug.
pub fn strip_stop_words(slug: &str) -> String {
    slug.split('-')
        .filter(|token| !token.is_empty() && !STOP_WORDS.contains(token))
        .collect::<Vec<_>>()
        .join("-")
}

/// Keep only ASCII alphanumerics.
pub fn compact(slug: &str) -> String {
    slug.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// The slug without a leading kind token, when what follows still names
/// something: at least [`MIN_QUALIFIER_LEN`] alphanumerics once stop-words
/// are dropped.
pub fn without_kind_prefix(slug: &str) -> Option<String> {
    let (first, rest) = slug.split_once('-')?;
    if !KIND_TOKENS.contains(&first) {
        return None;
    }
    let qualifier = compact(&strip_stop_words(rest));
    if qualifier.len() < MIN_QUALIFIER_LEN {
        return None;
    }
    Some(rest.to_string())
}

/// File name without directories and without its last extension.
pub fn base_name(file_name: &str) -> &str {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}
