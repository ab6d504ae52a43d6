//! Scheme allowlist standing in for the platform's "can open URL" query.

use codeshelf_core::SchemeOpener;
use std::collections::HashSet;
use url::Url;

/// Opens URLs whose scheme is in a fixed set.
#[derive(Debug, Clone, Default)]
pub struct KnownSchemes {
    schemes: HashSet<String>,
}

impl KnownSchemes {
    /// Creates an opener for `schemes` (case-insensitive).
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            schemes: schemes
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl SchemeOpener for KnownSchemes {
    fn can_open(&self, url: &Url) -> bool {
        // Url already lowercases the scheme.
        self.schemes.contains(url.scheme())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_open_known_scheme() {
        let opener = KnownSchemes::new(["TEL", " sms "]);
        assert!(opener.can_open(&Url::parse("tel:+15551234567").unwrap()));
        assert!(opener.can_open(&Url::parse("SMS:+15551234567").unwrap()));
        assert!(!opener.can_open(&Url::parse("spotify:track:1").unwrap()));
    }

    #[test]
    fn test_empty_opener_opens_nothing() {
        let opener = KnownSchemes::default();
        assert!(!opener.can_open(&Url::parse("mailto:a@b.c").unwrap()));
    }
}
