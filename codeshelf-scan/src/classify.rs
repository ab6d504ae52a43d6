//! Payload classification.

use codeshelf_core::{PayloadKind, SchemeOpener, TrackingFilter, extract_link};
use url::Url;

/// Classifies a decoded payload.
///
/// The first embedded link (or the whole text, if none) is parsed as a URL.
/// HTTP(S) URLs are [`PayloadKind::Web`], URLs the opener accepts are
/// [`PayloadKind::DeepLink`], and everything else is the original text.
pub fn classify(text: &str, opener: &dyn SchemeOpener) -> PayloadKind {
    let candidate = extract_link(text).trim();
    match Url::parse(candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
            PayloadKind::Web(url)
        }
        Ok(url) if opener.can_open(&url) => PayloadKind::DeepLink(url),
        _ => PayloadKind::Text(text.to_string()),
    }
}

/// Returns the text shown for `payload` when no resolution takes place.
///
/// Links are the extracted link with tracking parameters removed; plain
/// text is shown as decoded.
pub fn display_text(payload: &PayloadKind, original: &str, filter: &TrackingFilter) -> String {
    match payload {
        PayloadKind::Web(_) | PayloadKind::DeepLink(_) => {
            filter.sanitize(extract_link(original).trim())
        }
        PayloadKind::Text(text) => text.clone(),
    }
}
