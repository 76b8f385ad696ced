//! Property tests for name normalization and template resolution.
//!
//! Resolution must be a pure function of (type name, file list): the same
//! inputs always select the same file, an exact slug match always wins, and
//! equal scores go to the shortest name, then to the earliest listed.

use accord_templates::normalize::{clean_slug, compact, slug, strip_stop_words};
use accord_templates::{explain, resolve_template};
use proptest::prelude::*;

fn type_name() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "Convenio", "Acuerdo", "Marco", "de", "la", "Colaboración", "Prácticas",
            "Movilidad", "Específico", "y", "Investigación", "2024",
        ]),
        1..5,
    )
    .prop_map(|words| words.join(" "))
}

fn file_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        type_name().prop_map(|name| format!("{}.docx", name.replace(' ', "-").to_lowercase())),
        0..8,
    )
}

proptest! {
    #[test]
    fn slug_is_idempotent(raw in "\\PC{0,40}") {
        let once = slug(&raw);
        prop_assert_eq!(slug(&once), once.clone());
        prop_assert_eq!(clean_slug(&once), clean_slug(&raw));
        prop_assert_eq!(strip_stop_words(&clean_slug(&raw)), clean_slug(&raw));
        prop_assert_eq!(compact(&compact(&once)), compact(&once));
    }

    #[test]
    fn slug_is_hyphen_delimited_ascii(raw in "\\PC{0,40}") {
        let s = slug(&raw);
        prop_assert!(s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        prop_assert!(!s.starts_with('-') && !s.ends_with('-'));
        prop_assert!(!s.contains("--"));
    }

    #[test]
    fn resolution_is_deterministic(query in type_name(), files in file_list()) {
        let first = resolve_template(&query, &files).ok();
        let second = resolve_template(&query, &files).ok();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn winner_is_the_best_scored_listed_file(query in type_name(), files in file_list()) {
        if let Ok(winner) = resolve_template(&query, &files) {
            prop_assert!(files.contains(&winner.file_name));
            let all = explain(&query, &files);
            prop_assert!(all.iter().all(|c| c.score >= winner.score));
        }
    }

    #[test]
    fn exact_slug_match_always_wins(query in type_name(), mut files in file_list(), at in 0usize..8) {
        let exact = format!("{}.docx", query);
        let at = at.min(files.len());
        files.insert(at, exact);

        let winner = resolve_template(&query, &files).unwrap();
        prop_assert_eq!(winner.score, 0);
        prop_assert!(winner.file_name.chars().count() <= files[at].chars().count());
    }

    #[test]
    fn ties_go_to_the_shortest_then_earliest_file(query in type_name(), files in file_list()) {
        if let Ok(winner) = resolve_template(&query, &files) {
            let len = |name: &str| name.chars().count();
            let all = explain(&query, &files);
            let tied: Vec<&str> = all
                .iter()
                .filter(|c| c.score == winner.score)
                .map(|c| c.file_name.as_str())
                .collect();
            prop_assert!(tied.iter().all(|&name| len(name) >= len(winner.file_name.as_str())));

            let first_shortest = files
                .iter()
                .find(|f| tied.contains(&f.as_str()) && len(f.as_str()) == len(winner.file_name.as_str()));
            prop_assert_eq!(first_shortest, Some(&winner.file_name));
        }
    }
}
