//! Template resolution: pick the best template file for a type name.
//!
//! Each candidate is scored against the query with the rules below (lower is
//! better); candidates matching no rule are dropped.
//!
//! | score | rule |
//! |---|---|
//! | 0 | `slug(file) == slug(query)` |
//! | 1 | `clean_slug(file) == clean_slug(query)` |
//! | 2 | `compact(slug(file)) == compact(slug(query))` |
//! | 3 | `compact(clean_slug(file)) == compact(clean_slug(query))` |
//! | 4 | `compact(slug(file))` contains `compact(slug(query))` |
//! | 5 | `compact(clean_slug(file))` contains `compact(clean_slug(query))` |
//!
//! When the query leads with an agreement kind ("Convenio Marco"), the rules
//! are also applied to the query without that token ("Marco") and the best
//! score wins. Selection is a stable sort on `(score, file name length)`, so
//! remaining ties keep the input order.

use crate::error::{Result, TemplateError};
use crate::normalize::{base_name, compact, slug, strip_stop_words, without_kind_prefix};
use serde::Serialize;

/// A scored template file. Only lives for one resolution call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateCandidate {
    pub file_name: String,
    pub slug: String,
    pub clean_slug: String,
    pub compact: String,
    pub score: u8,
    /// Scored against the query with its agreement-kind token removed
    pub matched_qualifier: bool,
}

/// Normalized forms of one query variant.
#[derive(Debug, Clone)]
struct QueryForms {
    slug: String,
    clean_slug: String,
    compact_slug: String,
    compact_clean: String,
}

impl QueryForms {
    fn from_slug(slug: String) -> Self {
        let clean_slug = strip_stop_words(&slug);
        Self {
            compact_slug: compact(&slug),
            compact_clean: compact(&clean_slug),
            slug,
            clean_slug,
        }
    }

    fn score(&self, file_slug: &str, file_clean: &str) -> Option<u8> {
        let file_compact = compact(file_slug);
        let file_compact_clean = compact(file_clean);
        // An all-stop-word query has no clean form; the clean rules would
        // otherwise match every file through the empty string.
        let has_clean = !self.clean_slug.is_empty();

        if file_slug == self.slug {
            Some(0)
        } else if has_clean && file_clean == self.clean_slug {
            Some(1)
        } else if file_compact == self.compact_slug {
            Some(2)
        } else if has_clean && file_compact_clean == self.compact_clean {
            Some(3)
        } else if file_compact.contains(&self.compact_slug) {
            Some(4)
        } else if has_clean && file_compact_clean.contains(&self.compact_clean) {
            Some(5)
        } else {
            None
        }
    }
}

fn query_variants(type_name: &str) -> Vec<QueryForms> {
    let full = slug(type_name);
    if full.is_empty() {
        return Vec::new();
    }
    let mut variants = Vec::with_capacity(2);
    let qualifier = without_kind_prefix(&full);
    variants.push(QueryForms::from_slug(full));
    if let Some(qualifier) = qualifier {
        variants.push(QueryForms::from_slug(qualifier));
    }
    variants
}

/// Score every file against `type_name`, best first.
///
/// Unscored files are omitted. The order is exactly the order in which
/// [`resolve_template`] would consider them.
pub fn explain<S: AsRef<str>>(type_name: &str, files: &[S]) -> Vec<TemplateCandidate> {
    let variants = query_variants(type_name);
    if variants.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<TemplateCandidate> = files
        .iter()
        .filter_map(|file| {
            let file_name = file.as_ref();
            let file_slug = slug(base_name(file_name));
            if file_slug.is_empty() {
                return None;
            }
            let file_clean = strip_stop_words(&file_slug);

            let (variant_idx, score) = variants
                .iter()
                .enumerate()
                .filter_map(|(idx, q)| q.score(&file_slug, &file_clean).map(|s| (idx, s)))
                .min_by_key(|(idx, s)| (*s, *idx))?;

            Some(TemplateCandidate {
                file_name: file_name.to_string(),
                compact: compact(&file_slug),
                slug: file_slug,
                clean_slug: file_clean,
                score,
                matched_qualifier: variant_idx > 0,
            })
        })
        .collect();

    // Stable: equal keys keep their input order.
    scored.sort_by_key(|c| (c.score, c.file_name.chars().count()));
    scored
}

/// Resolve the single best template for `type_name` among `files`.
///
/// Pure function of its inputs: identical arguments always give the same
/// answer.
pub fn resolve_template<S: AsRef<str>>(type_name: &str, files: &[S]) -> Result<TemplateCandidate> {
    explain(type_name, files)
        .into_iter()
        .next()
        .ok_or_else(|| TemplateError::NoTemplateMatch {
            type_name: type_name.to_string(),
            candidates: files.len(),
        })
}
