//! URL resolution for intercepted requests.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a request URL the way a page would.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references (`/app.js`, `icons/a.png`) against `base`
/// 3. Remove fragment (#...)
/// 4. Keep query string intact (do not reorder)
///
/// Non-http schemes are preserved so the worker can decide to bypass them.
pub fn resolve(input: &str, base: &url::Url) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether two URLs share scheme, host and port.
pub fn is_same_origin(a: &url::Url, b: &url::Url) -> bool {
    a.origin() == b.origin()
}

/// Whether the URL's scheme is one of `schemes` (compared case-insensitively).
pub fn has_scheme(url: &url::Url, schemes: &[String]) -> bool {
    schemes.iter().any(|s| s.eq_ignore_ascii_case(url.scheme()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> url::Url {
        url::Url::parse("https://example.com/fortune-learning-pwa/").unwrap()
    }

    #[test]
    fn test_resolve_absolute() {
        let url = resolve("https://cdn.example.org/lib.js", &base()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.org/lib.js");
    }

    #[test]
    fn test_resolve_root_relative() {
        let url = resolve("/other/app.js", &base()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/other/app.js");
    }

    #[test]
    fn test_resolve_scope_relative() {
        let url = resolve("icons/icon-192.png", &base()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/fortune-learning-pwa/icons/icon-192.png");
    }

    #[test]
    fn test_resolve_remove_fragment_keep_query() {
        let url = resolve("index.html?a=1&b=2#top", &base()).unwrap();
        assert_eq!(url.query(), Some("a=1&b=2"));
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_resolve_keeps_extension_scheme() {
        let url = resolve("chrome-extension://abcdef/content.js", &base()).unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve("   ", &base()), Err(UrlError::Empty)));
    }

    #[test]
    fn test_same_origin() {
        let a = url::Url::parse("https://example.com/a").unwrap();
        let b = url::Url::parse("https://example.com:443/b").unwrap();
        let c = url::Url::parse("http://example.com/a").unwrap();
        assert!(is_same_origin(&a, &b));
        assert!(!is_same_origin(&a, &c));
    }

    #[test]
    fn test_has_scheme() {
        let schemes = vec!["chrome-extension".to_string()];
        let ext = url::Url::parse("chrome-extension://abc/x.js").unwrap();
        let web = url::Url::parse("https://example.com/").unwrap();
        assert!(has_scheme(&ext, &schemes));
        assert!(!has_scheme(&web, &schemes));
    }
}
