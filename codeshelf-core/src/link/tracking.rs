//! Tracking-parameter filter.
//!
//! Removes query parameters used for marketing attribution. Scheme, host,
//! path, and fragment are never touched, and the remaining parameters keep
//! their order and their original encoding.

use url::Url;
use url::form_urlencoded;

use crate::error::CoreError;

/// Query parameter names stripped from every URL (compared case-insensitively).
pub const TRACKING_PARAMETERS: &[&str] = &[
    // Google Analytics / Ads
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "utm_name",
    "gclid",
    "gclsrc",
    "dclid",
    "gbraid",
    "wbraid",
    "_ga",
    "_gl",
    // Social networks
    "fbclid",
    "igshid",
    "igsh",
    "twclid",
    "ttclid",
    "li_fat_id",
    "ref_src",
    // Other ad networks
    "msclkid",
    "yclid",
    "mc_cid",
    "mc_eid",
    "mkt_tok",
    "_hsenc",
    "_hsmi",
    "__hssc",
    "__hstc",
    "__hsfp",
    "oly_anon_id",
    "oly_enc_id",
    "rb_clickid",
    "s_cid",
    "vero_conv",
    "vero_id",
    "wickedid",
];

/// Any parameter starting with this prefix is treated as tracking.
const UTM_PREFIX: &str = "utm_";

/// Strips deny-listed query parameters from URLs.
#[derive(Debug, Clone, Default)]
pub struct TrackingFilter {
    extra: Vec<String>,
}

impl TrackingFilter {
    /// Creates a filter with the built-in deny-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds parameter names to the deny-list.
    #[must_use]
    pub fn with_extra<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra.extend(
            names
                .into_iter()
                .map(|n| n.as_ref().trim().to_ascii_lowercase())
                .filter(|n| !n.is_empty()),
        );
        self
    }

    /// Returns true if `name` is a tracking parameter.
    pub fn is_tracking(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        lower.starts_with(UTM_PREFIX)
            || TRACKING_PARAMETERS.contains(&lower.as_str())
            || self.extra.iter().any(|e| *e == lower)
    }

    /// Removes tracking parameters from `url` in place.
    ///
    /// Returns true if anything was removed.
    pub fn strip_url(&self, url: &mut Url) -> bool {
        let Some(query) = url.query() else {
            return false;
        };

        let segments: Vec<&str> = query.split('&').collect();
        let kept: Vec<&str> = segments
            .iter()
            .copied()
            .filter(|segment| !segment.is_empty())
            .filter(|segment| !self.is_tracking(&decoded_name(segment)))
            .collect();

        let kept_non_empty = segments.iter().filter(|s| !s.is_empty()).count();
        if kept.len() == kept_non_empty {
            return false;
        }

        let rebuilt = kept.join("&");
        if rebuilt.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&rebuilt));
        }
        true
    }

    /// Parses `input` and returns it without tracking parameters.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidUrl`] if `input` is not an absolute URL.
    pub fn strip(&self, input: &str) -> Result<String, CoreError> {
        let mut url = Url::parse(input.trim())?;
        if self.strip_url(&mut url) {
            Ok(url.into())
        } else {
            // Nothing removed: keep the caller's exact spelling.
            Ok(input.trim().to_string())
        }
    }

    /// Like [`TrackingFilter::strip`], but returns the input unchanged when
    /// it is not a URL.
    pub fn sanitize(&self, input: &str) -> String {
        self.strip(input).unwrap_or_else(|_| input.to_string())
    }
}

/// Strips the built-in deny-list from `input`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidUrl`] if `input` is not an absolute URL.
pub fn strip_tracking_parameters(input: &str) -> Result<String, CoreError> {
    TrackingFilter::new().strip(input)
}

fn decoded_name(segment: &str) -> String {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(name, _)| name.into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_utm_and_keeps_order() {
        let out = strip_tracking_parameters(
            "https://example.com/p?b=2&utm_source=qr&a=1&fbclid=xyz&c=3#frag",
        )
        .unwrap();
        assert_eq!(out, "https://example.com/p?b=2&a=1&c=3#frag");
    }

    #[test]
    fn test_removes_query_when_all_tracking() {
        let out = strip_tracking_parameters("https://example.com/page?utm_source=qr").unwrap();
        assert_eq!(out, "https://example.com/page");
    }

    #[test]
    fn test_case_insensitive_and_prefix() {
        let out =
            strip_tracking_parameters("https://e.com/?UTM_Source=a&utm_whatever=b&GCLID=c&q=1")
                .unwrap();
        assert_eq!(out, "https://e.com/?q=1");
    }

    #[test]
    fn test_percent_encoded_name_is_matched() {
        let out = strip_tracking_parameters("https://e.com/?utm%5Fsource=a&q=1").unwrap();
        assert_eq!(out, "https://e.com/?q=1");
    }

    #[test]
    fn test_preserves_value_encoding() {
        let out = strip_tracking_parameters("https://e.com/s?q=a%20b+c&gclid=1").unwrap();
        assert_eq!(out, "https://e.com/s?q=a%20b+c");
    }

    #[test]
    fn test_untouched_when_nothing_to_strip() {
        let input = "https://Example.com/a?x=1";
        assert_eq!(strip_tracking_parameters(input).unwrap(), input);
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://e.com/?utm_source=a&&q=1&",
            "https://e.com/?q=1&fbclid=2#x",
            "http://final/3",
            "https://e.com/?utm_medium=x",
        ];
        for input in inputs {
            let once = strip_tracking_parameters(input).unwrap();
            let twice = strip_tracking_parameters(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            strip_tracking_parameters("not a url"),
            Err(CoreError::InvalidUrl(_))
        ));
        let filter = TrackingFilter::new();
        assert_eq!(filter.sanitize("hello world"), "hello world");
    }

    #[test]
    fn test_extra_parameters() {
        let filter = TrackingFilter::new().with_extra(["Session_Ref", " "]);
        assert!(filter.is_tracking("session_ref"));
        assert_eq!(
            filter.strip("https://e.com/?session_ref=1&id=7").unwrap(),
            "https://e.com/?id=7"
        );
    }

    #[test]
    fn test_no_deny_listed_param_survives() {
        let filter = TrackingFilter::new();
        let query: Vec<String> = TRACKING_PARAMETERS
            .iter()
            .map(|p| format!("{p}=v"))
            .chain(std::iter::once("keep=1".to_string()))
            .collect();
        let input = format!("https://e.com/?{}", query.join("&"));
        let out = filter.strip(&input).unwrap();
        assert_eq!(out, "https://e.com/?keep=1");
    }
}
