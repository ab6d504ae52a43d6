//! Classification of decoded payloads.

use url::Url;

/// What a scanned or shared payload turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadKind {
    /// An `http` or `https` URL that can be fetched and resolved.
    Web(Url),
    /// A URL whose scheme the platform hands to another app.
    DeepLink(Url),
    /// Anything else; stored verbatim.
    Text(String),
}

impl PayloadKind {
    /// Returns true for fetchable web URLs.
    pub fn is_web(&self) -> bool {
        matches!(self, Self::Web(_))
    }

    /// Returns the URL for web and deep-link payloads.
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Web(url) | Self::DeepLink(url) => Some(url),
            Self::Text(_) => None,
        }
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Web(_) => "web",
            Self::DeepLink(_) => "deep_link",
            Self::Text(_) => "text",
        }
    }
}
