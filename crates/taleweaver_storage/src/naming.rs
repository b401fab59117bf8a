//! Story filename generation and validation.

use chrono::{DateTime, Utc};
use taleweaver_core::StoryKind;
use uuid::Uuid;

/// Characters of the prompt kept in a filename.
const PROMPT_CHARS: usize = 30;

/// Reduce a prompt to a filename-safe fragment.
///
/// Keeps ASCII letters, digits, `-` and `_` from the first characters of the
/// prompt and turns spaces into underscores.
///
/// # Examples
///
/// ```
/// use taleweaver_storage::sanitize_prompt;
///
/// assert_eq!(sanitize_prompt("A robot learns to paint!"), "A_robot_learns_to_paint");
/// assert_eq!(sanitize_prompt("../../etc"), "etc");
/// assert_eq!(sanitize_prompt("¿?"), "untitled");
/// ```
pub fn sanitize_prompt(prompt: &str) -> String {
    let kept: String = prompt
        .chars()
        .take(PROMPT_CHARS)
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let safe = kept.trim().replace(' ', "_");
    if safe.is_empty() {
        "untitled".to_string()
    } else {
        safe
    }
}

/// Build a unique filename for a new story.
///
/// Format: `<prefix>_YYYYMMDD_HHMMSS_<8 hex>_<prompt>.txt`.
pub fn generate_filename(kind: StoryKind, prompt: &str, now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}_{}.txt",
        kind.file_prefix(),
        now.format("%Y%m%d_%H%M%S"),
        &suffix[..8],
        sanitize_prompt(prompt)
    )
}

/// Whether a name can identify a story inside the output directory.
///
/// Valid names are a single path component of ASCII letters, digits, `-`,
/// `_` and `.`, do not start with `.`, and end in `.txt`.
pub fn is_valid_filename(filename: &str) -> bool {
    filename.len() > ".txt".len()
        && !filename.starts_with('.')
        && filename.ends_with(".txt")
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generated_names_are_valid_and_unique() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let first = generate_filename(StoryKind::Original, "A robot learns to paint", now);
        let second = generate_filename(StoryKind::Original, "A robot learns to paint", now);

        assert!(first.starts_with("story_20240309_140507_"));
        assert!(first.ends_with("_A_robot_learns_to_paint.txt"));
        assert!(is_valid_filename(&first));
        assert_ne!(first, second);
    }

    #[test]
    fn test_continuation_prefix() {
        let name = generate_filename(StoryKind::Continuation, "add a dragon", Utc::now());
        assert!(name.starts_with("story_continuation_"));
        assert!(is_valid_filename(&name));
    }

    #[test]
    fn test_prompt_is_truncated() {
        let long = "word ".repeat(20);
        assert!(sanitize_prompt(&long).len() <= PROMPT_CHARS);
    }

    #[test]
    fn test_invalid_names() {
        for name in [
            "",
            ".txt",
            "../story.txt",
            "a/b.txt",
            "a\\b.txt",
            ".hidden.txt",
            "story.txt.meta.json",
            "story.md",
            "story one.txt",
            "störy.txt",
        ] {
            assert!(!is_valid_filename(name), "{name} should be rejected");
        }
        assert!(is_valid_filename("story_20240309_140507_abcd1234_x.txt"));
    }
}
