//! Short display form of URLs.

use url::Url;

/// Returns `input` without scheme, leading `www.`, and trailing `/`.
///
/// Text that is not a web URL is returned unchanged.
pub fn prettify(input: &str) -> String {
    let Ok(url) = Url::parse(input.trim()) else {
        return input.to_string();
    };
    if !matches!(url.scheme(), "http" | "https") {
        return input.to_string();
    }
    let Some(host) = url.host_str() else {
        return input.to_string();
    };

    let mut out = host.strip_prefix("www.").unwrap_or(host).to_string();
    if let Some(port) = url.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(url.path());
    if let Some(query) = url.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        out.push('#');
        out.push_str(fragment);
    }

    while out.ends_with('/') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prettify() {
        assert_eq!(prettify("https://www.example.com/"), "example.com");
        assert_eq!(prettify("http://example.com/a/b/"), "example.com/a/b");
        assert_eq!(prettify("https://e.com:8443/x?q=1#top"), "e.com:8443/x?q=1#top");
    }

    #[test]
    fn test_non_web_passes_through() {
        assert_eq!(prettify("hello world"), "hello world");
        assert_eq!(prettify("mailto:a@b.c"), "mailto:a@b.c");
    }
}
