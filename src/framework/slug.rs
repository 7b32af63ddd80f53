// Slug generation - URL-safe identifiers derived from post titles

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

pub const MAX_SLUG_LEN: usize = 200;

/// Upper bound on `-N` suffixes tried before giving up on a title.
pub const MAX_SLUG_ATTEMPTS: u32 = 100;

const FALLBACK_SLUG: &str = "post";

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("slug character class is valid"));

static SEPARATOR_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-\s]+").expect("separator pattern is valid"));

/// Lowercase, hyphenated, ASCII-only transform of `title`.
///
/// The title is NFKD-decomposed so accented letters keep their base letter,
/// then whatever is still non-ASCII is dropped. Anything that is not a word character,
/// whitespace or a hyphen is removed, and runs of whitespace/hyphens collapse
/// into one `-`. Leading and trailing `-`/`_` are stripped.
pub fn slugify(title: &str) -> String {
    let ascii: String = title.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let cleaned = NON_SLUG_CHARS.replace_all(&lowered, "");
    let hyphenated = SEPARATOR_RUNS.replace_all(cleaned.trim(), "-");
    let slug = trim_separators(truncate(trim_separators(&hyphenated), MAX_SLUG_LEN));

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// The slug tried on the given attempt: `base` first, then `base-2`, `base-3`...
/// The base is shortened so the suffixed slug still fits the column.
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        return truncate(base, MAX_SLUG_LEN).to_string();
    }
    let suffix = format!("-{}", attempt);
    let room = MAX_SLUG_LEN.saturating_sub(suffix.len());
    format!("{}{}", trim_separators(truncate(base, room)), suffix)
}

fn trim_separators(value: &str) -> &str {
    value.trim_matches(|c| c == '-' || c == '_')
}

// Slugs are ASCII at this point, so byte and char boundaries coincide.
fn truncate(value: &str, max: usize) -> &str {
    if value.len() <= max {
        value
    } else {
        &value[..max]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic_titles() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust: Ownership & Borrowing!  "), "rust-ownership-borrowing");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("multiple   spaces -- and---dashes"), "multiple-spaces-and-dashes");
        assert_eq!(slugify("_leading and trailing_"), "leading-and-trailing");
    }

    #[test]
    fn test_slugify_transliterates_accents() {
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("Über naïve résumé"), "uber-naive-resume");
        assert_eq!(slugify("ﬁle №5"), "file-no5");
        assert_eq!(slugify("日本語"), "post");
        assert_eq!(slugify("!!!"), "post");
    }

    #[test]
    fn test_slugify_truncates() {
        let long_title = "word ".repeat(100);
        let slug = slugify(&long_title);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_slug_candidates() {
        assert_eq!(slug_candidate("hello-world", 1), "hello-world");
        assert_eq!(slug_candidate("hello-world", 2), "hello-world-2");
        assert_eq!(slug_candidate("hello-world", 17), "hello-world-17");

        let base = "a".repeat(MAX_SLUG_LEN);
        let candidate = slug_candidate(&base, 3);
        assert_eq!(candidate.len(), MAX_SLUG_LEN);
        assert!(candidate.ends_with("-3"));
    }
}
