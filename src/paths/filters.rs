use regex::Regex;

fn uri_ignores() -> &'static [Regex] {
    use std::sync::OnceLock;

    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*:").expect("invalid scheme regex"),
                Regex::new(r"^//").expect("invalid protocol-relative regex"),
                Regex::new(r"^#").expect("invalid fragment regex"),
                Regex::new(r"^~").expect("invalid module request regex"),
            ]
        })
        .as_slice()
}

/// Determine whether a `url()` payload should be left untouched.
///
/// Anything carrying a scheme (`data:`, `http:`, `file:`...), protocol-relative URLs, bare
/// fragment references used by SVG filters and module requests (`~package/...`) can never be
/// found relative to an authored stylesheet, so they are excluded before any probing happens.
pub fn should_ignore_uri(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || uri_ignores().iter().any(|pattern| pattern.is_match(value))
}

/// Returns `true` for root-relative URIs such as `/images/logo.png`.
pub fn is_absolute_uri(value: &str) -> bool {
    value.starts_with('/') && !value.starts_with("//")
}
