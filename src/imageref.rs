//! Image reference normalization.
//!
//! Content cells reference images three ways: absolute URLs (including data
//! URIs), bare relative paths, and a bracketed `[img]...[/img]` wrapper
//! inherited from the source material. All of them resolve to a plain string
//! the renderer can hand to an `<img>` element.

use once_cell::sync::Lazy;
use regex::Regex;

static BRACKET_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\[img\](.*?)\[/img\]").unwrap());
static ABSOLUTE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(https?://|data:)").unwrap());

/// Resolve a raw image reference against a base path.
///
/// Total over all string inputs: malformed bracket tags fall through to the
/// plain relative rule, and an empty reference stays empty. Absolute URLs and
/// data URIs pass through unchanged, so the function is idempotent on
/// already-normalized absolute references.
pub fn normalize_image_reference(raw: &str, base: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let trimmed = raw.trim();
    if let Some(captures) = BRACKET_TAG.captures(trimmed) {
        return resolve(captures[1].trim(), base);
    }
    resolve(trimmed, base)
}

fn resolve(reference: &str, base: &str) -> String {
    if ABSOLUTE_URL.is_match(reference) {
        return reference.to_string();
    }
    format!("{}{}", base, reference.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_relative_path_gets_base() {
        assert_eq!(
            normalize_image_reference("[img]photo.jpg[/img]", "/site/"),
            "/site/photo.jpg"
        );
    }

    #[test]
    fn bracketed_absolute_url_passes_through() {
        assert_eq!(
            normalize_image_reference("[img]https://x/y.jpg[/img]", "/site/"),
            "https://x/y.jpg"
        );
        assert_eq!(
            normalize_image_reference("[IMG] data:image/png;base64,AAAA [/IMG]", "/site/"),
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn absolute_urls_are_unchanged_and_idempotent() {
        let once = normalize_image_reference("https://x/y.jpg", "/site/");
        assert_eq!(once, "https://x/y.jpg");
        assert_eq!(normalize_image_reference(&once, "/site/"), once);
    }

    #[test]
    fn empty_reference_stays_empty() {
        assert_eq!(normalize_image_reference("", "/site/"), "");
    }

    #[test]
    fn relative_paths_lose_leading_slashes() {
        assert_eq!(
            normalize_image_reference("//images/frog.jpeg", "/site/"),
            "/site/images/frog.jpeg"
        );
        assert_eq!(
            normalize_image_reference("  images/frog.jpeg  ", "/site/"),
            "/site/images/frog.jpeg"
        );
    }

    #[test]
    fn malformed_bracket_tag_is_treated_as_relative() {
        assert_eq!(
            normalize_image_reference("[img]photo.jpg", "/site/"),
            "/site/[img]photo.jpg"
        );
    }
}
