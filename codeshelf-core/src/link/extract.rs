//! Link extraction from free-form text.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Candidate links: `scheme://...` or one of the host-less schemes.
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:[a-z][a-z0-9+.\-]*://|(?:mailto|tel|sms):)[^\s<>"'`]+"#)
        .expect("Invalid regex")
});

/// Schemes accepted without a host component.
const HOSTLESS_SCHEMES: &[&str] = &["mailto", "tel", "sms"];

/// Returns the first well-formed link in `text`, if any.
pub fn find_link(text: &str) -> Option<&str> {
    LINK_RE
        .find_iter(text)
        .map(|m| trim_trailing(m.as_str()))
        .find(|candidate| is_well_formed(candidate))
}

/// Returns the first well-formed link in `text`, or `text` unchanged.
///
/// A missing link is not an error; plain text passes straight through.
pub fn extract_link(text: &str) -> &str {
    find_link(text).unwrap_or(text)
}

fn is_well_formed(candidate: &str) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    if HOSTLESS_SCHEMES.contains(&url.scheme()) {
        return !url.path().is_empty();
    }
    url.host_str().is_some_and(|h| !h.is_empty())
}

/// Drops sentence punctuation and unbalanced closing brackets from the end.
fn trim_trailing(candidate: &str) -> &str {
    let mut end = candidate.len();
    loop {
        let current = &candidate[..end];
        let Some(last) = current.chars().last() else {
            break;
        };
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            ')' => current.matches('(').count() < current.matches(')').count(),
            ']' => current.matches('[').count() < current.matches(']').count(),
            '}' => current.matches('{').count() < current.matches('}').count(),
            _ => false,
        };
        if !strip {
            break;
        }
        end -= last.len_utf8();
    }
    &candidate[..end]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_embedded_link() {
        assert_eq!(
            extract_link("see https://a.example/x?utm_source=y now"),
            "https://a.example/x?utm_source=y"
        );
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(extract_link("hello world"), "hello world");
        assert_eq!(extract_link(""), "");
        assert!(find_link("WIFI:S:Home;T:WPA;P:secret;;").is_none());
    }

    #[test]
    fn test_first_link_wins() {
        assert_eq!(
            extract_link("a http://one.example b https://two.example"),
            "http://one.example"
        );
    }

    #[test]
    fn test_trailing_punctuation_trimmed() {
        assert_eq!(extract_link("Go to https://e.com/a."), "https://e.com/a");
        assert_eq!(
            extract_link("Visit (https://e.com/a_(b)) today."),
            "https://e.com/a_(b)"
        );
    }

    #[test]
    fn test_hostless_candidate_skipped() {
        assert_eq!(
            extract_link("broken http:// then https://ok.example/p"),
            "https://ok.example/p"
        );
    }

    #[test]
    fn test_custom_scheme_and_mailto() {
        assert_eq!(
            extract_link("open spotify://track/123 please"),
            "spotify://track/123"
        );
        assert_eq!(
            extract_link("write to mailto:hi@example.com!"),
            "mailto:hi@example.com"
        );
    }

    #[test]
    fn test_never_panics_on_odd_input() {
        for input in ["://", "http://[::1", "ñ://ü", "\u{0}http://x", "((((https://e.com"] {
            let _ = extract_link(input);
        }
    }
}
