//! URL slug generation for image pages.
//!
//! Slugs combine the display title, an optional scientific name and an
//! optional stable id into one lowercase hyphenated token, safe for use
//! in page routes and the sitemap. Generation is deterministic except
//! for the short-result padding branch, which mixes in the current time
//! to keep pathological near-empty titles from colliding.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

static EMPHASIS_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:em|i)>").expect("emphasis pattern"));

static VALID_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]+(?:-[a-z0-9_]+)*$").expect("slug pattern"));

const MIN_SLUG_LEN: usize = 3;
const EMPTY_FALLBACK: &str = "image";
const UNTITLED: &str = "untitled";

/// Build a URL-safe slug from a title, an optional scientific name and
/// an optional id.
///
/// The scientific name is stripped of `<em>`/`<i>` emphasis markup
/// before joining. Whitespace runs become single hyphens, anything
/// outside word characters and hyphens is dropped, hyphen runs collapse
/// and leading/trailing hyphens are trimmed. Results shorter than three
/// characters get a base-36 timestamp suffix so that generic short
/// slugs cannot collide. The returned slug always has length >= 3.
pub fn generate_slug(title: &str, scientific_name: &str, id: &str) -> String {
    let cleaned = EMPHASIS_TAGS.replace_all(scientific_name, "");
    let cleaned = cleaned.trim();

    let base = if title.trim().is_empty() && !(cleaned.is_empty() && id.is_empty()) {
        UNTITLED
    } else {
        title
    };

    let mut combined = base.to_owned();
    if !cleaned.is_empty() {
        combined.push('-');
        combined.push_str(cleaned);
    }
    if !id.is_empty() {
        combined.push('-');
        combined.push_str(id);
    }

    let slug = sanitize(&combined);
    if slug.is_empty() {
        return format!("{EMPTY_FALLBACK}-{}", base36(now_millis()));
    }
    if slug.len() < MIN_SLUG_LEN {
        return format!("{slug}-{}", base36(now_millis()));
    }
    slug
}

/// True when `slug` is something `generate_slug` could have produced:
/// lowercase word characters in hyphen-separated runs, at least three
/// characters, no leading/trailing/doubled hyphens.
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() >= MIN_SLUG_LEN && VALID_SLUG.is_match(slug)
}

fn sanitize(input: &str) -> String {
    let lowered = input.to_lowercase();

    // Whitespace runs become single hyphens, everything outside
    // [a-z0-9_-] is dropped.
    let mut kept = String::with_capacity(lowered.len());
    let mut in_space = false;
    for c in lowered.chars() {
        if c.is_whitespace() {
            if !in_space {
                kept.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            kept.push(c);
        }
    }

    // Collapse hyphen runs.
    let mut collapsed = String::with_capacity(kept.len());
    let mut prev_dash = false;
    for c in kept.chars() {
        if c == '-' {
            if !prev_dash {
                collapsed.push('-');
            }
            prev_dash = true;
        } else {
            collapsed.push(c);
            prev_dash = false;
        }
    }

    collapsed.trim_matches('-').to_owned()
}

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

fn base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_owned();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn full_inputs() {
        let slug = generate_slug("Philippine Eagle", "Pithecophaga jefferyi", "1");

        assert_eq!(slug, "philippine-eagle-pithecophaga-jefferyi-1");
    }

    #[test]
    fn emphasis_markup_stripped() {
        let slug = generate_slug("Philippine Eagle", "<em>Pithecophaga jefferyi</em>", "1");

        assert_eq!(slug, "philippine-eagle-pithecophaga-jefferyi-1");
    }

    #[test]
    fn all_blank_falls_back_to_timestamped_image() {
        let slug = generate_slug("", "", "");

        assert!(slug.starts_with("image-"));
        assert!(slug.len() > "image-".len());
    }

    #[test]
    fn blank_title_with_id_uses_untitled() {
        let slug = generate_slug("", "", "42");

        assert_eq!(slug, "untitled-42");
    }

    #[test]
    fn short_result_gets_padded() {
        let slug = generate_slug("Ox", "", "");

        assert!(slug.starts_with("ox-"));
        assert!(slug.len() >= 3);
    }

    #[rstest]
    #[case("Philippine Eagle", "Pithecophaga jefferyi", "1")]
    #[case("  Spaced   Out  Title ", "", "")]
    #[case("Heron!", "<i>Ardea</i>", "7")]
    #[case("", "", "")]
    #[case("Ox", "", "")]
    #[trace]
    fn generated_slugs_are_valid(#[case] title: &str, #[case] scientific: &str, #[case] id: &str) {
        // Act
        let slug = generate_slug(title, scientific, id);

        // Assert
        assert!(is_valid_slug(&slug), "invalid slug: {slug}");
        assert!(slug.len() >= 3);
    }

    #[rstest]
    #[case("philippine-eagle", true)]
    #[case("a-b", true)]
    #[case("ab", false)]
    #[case("-leading", false)]
    #[case("trailing-", false)]
    #[case("double--dash", false)]
    #[case("Upper-Case", false)]
    #[trace]
    fn slug_validation(#[case] slug: &str, #[case] expected: bool) {
        assert_eq!(is_valid_slug(slug), expected);
    }
}
