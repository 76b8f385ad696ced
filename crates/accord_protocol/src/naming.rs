use crate::defaults::MAX_DISPLAY_NAME_CHARS;
use chrono::NaiveDate;

/// Returns true if the name can be sent to the store as-is.
pub fn is_safe_display_name(name: &str) -> bool {
    !name.is_empty()
        && name == name.trim()
        && name.chars().count() <= MAX_DISPLAY_NAME_CHARS
        && !name.contains("  ")
        && name
            .chars()
            .all(|c| !c.is_control() && !matches!(c, '/' | '\\'))
}

/// Canonicalize a display name for files and folders in the store.
///
/// Path separators become `-`, control characters and runs of whitespace
/// collapse to one space, and the result is capped in length. Empty input
/// falls back to `fallback`.
pub fn safe_display_name(name: &str, fallback: &str) -> String {
    if is_safe_display_name(name) {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len());
    let mut last_was_space = false;
    for ch in name.chars() {
        let mapped = if matches!(ch, '/' | '\\') {
            '-'
        } else if ch.is_control() || ch.is_whitespace() {
            ' '
        } else {
            ch
        };

        if mapped == ' ' {
            if last_was_space {
                continue;
            }
            last_was_space = true;
        } else {
            last_was_space = false;
        }
        out.push(mapped);
    }

    let trimmed = out.trim();
    let capped: String = trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect();
    let capped = capped.trim_end().to_string();
    if capped.is_empty() {
        fallback.to_string()
    } else {
        capped
    }
}

/// Short, stable digest used to tell submissions of the same type apart.
pub fn submission_digest(submission_id: &str) -> String {
    blake3::hash(submission_id.as_bytes()).to_hex()[..8].to_string()
}

/// Name of the per-submission folder: `<date> <type name> <digest>`.
pub fn submission_folder_name(date: NaiveDate, type_name: &str, submission_id: &str) -> String {
    let raw = format!(
        "{} {} {}",
        date.format("%Y-%m-%d"),
        type_name.trim(),
        submission_digest(submission_id)
    );
    safe_display_name(&raw, "submission")
}

/// Display name of the main document: `<type name> - <digest>`.
pub fn document_display_name(type_name: &str, submission_id: &str) -> String {
    let raw = format!("{} - {}", type_name.trim(), submission_digest(submission_id));
    safe_display_name(&raw, "document")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_display_name_preserves_safe_names() {
        let name = "Convenio Marco - 1a2b3c4d";
        assert_eq!(safe_display_name(name, "x"), name);
    }

    #[test]
    fn safe_display_name_replaces_separators_and_whitespace() {
        let safe = safe_display_name("  Acuerdo/Anexo\t\n  2024 ", "x");
        assert_eq!(safe, "Acuerdo-Anexo 2024");
        assert!(is_safe_display_name(&safe));
    }

    #[test]
    fn safe_display_name_handles_empty_and_long() {
        assert_eq!(safe_display_name("   ", "documento"), "documento");
        let long = "a".repeat(MAX_DISPLAY_NAME_CHARS + 50);
        assert_eq!(
            safe_display_name(&long, "x").chars().count(),
            MAX_DISPLAY_NAME_CHARS
        );
    }

    #[test]
    fn submission_folder_name_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let a = submission_folder_name(date, "Convenio Marco", "sub-1");
        let b = submission_folder_name(date, "Convenio Marco", "sub-1");
        let c = submission_folder_name(date, "Convenio Marco", "sub-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("2024-03-09 Convenio Marco "));
        assert_eq!(a.len(), "2024-03-09 Convenio Marco ".len() + 8);
    }
}
