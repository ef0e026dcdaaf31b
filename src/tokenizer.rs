//! Split CSS declaration values into literal text and `url()` references.
//!
//! Quoted payloads may not contain their own quote character, escaped or not. Values that rely
//! on `\'` or `\"` inside a quoted `url()` are therefore split at the first matching quote, which
//! keeps reconstruction byte-for-byte identical for existing inputs.

use std::fmt;

use regex::Regex;

fn url_pattern() -> &'static Regex {
    use std::sync::OnceLock;

    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?i)\b(url\(\s*)(?:'([^']*)'|"([^"]*)"|((?:[^'"\s)\\]|\\.)(?:[^)\\]|\\.)*?))(\s*\))"#,
        )
        .expect("invalid url() regex")
    })
}

/// Quote style used around a `url()` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `url('...')`
    Single,
    /// `url("...")`
    Double,
    /// `url(...)`
    None,
}

impl QuoteStyle {
    fn as_str(self) -> &'static str {
        match self {
            Self::Single => "'",
            Self::Double => "\"",
            Self::None => "",
        }
    }
}

/// A `url()` occurrence within a declaration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlReference {
    /// Opening text up to the payload, e.g. `url( `.
    pub open: String,
    /// Quote wrapping the payload.
    pub quote: QuoteStyle,
    /// Payload between the quotes. This is the only substitutable part.
    pub uri: String,
    /// Closing text after the payload, e.g. ` )`.
    pub close: String,
    /// Byte offset of the payload within the original value.
    pub offset: usize,
}

/// A span of a tokenized declaration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlToken {
    /// Text reproduced verbatim.
    Literal(String),
    /// A `url()` reference.
    Url(UrlReference),
}

impl fmt::Display for UrlToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => f.write_str(text),
            Self::Url(reference) => {
                let quote = reference.quote.as_str();
                write!(
                    f,
                    "{}{quote}{}{quote}{}",
                    reference.open, reference.uri, reference.close
                )
            }
        }
    }
}

/// Split a value into literal spans and `url()` references.
///
/// Malformed or unterminated constructs never match and stay inside a literal span.
pub fn tokenize(value: &str) -> Vec<UrlToken> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    for caps in url_pattern().captures_iter(value) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let (quote, payload) = if let Some(single) = caps.get(2) {
            (QuoteStyle::Single, single)
        } else if let Some(double) = caps.get(3) {
            (QuoteStyle::Double, double)
        } else if let Some(bare) = caps.get(4) {
            (QuoteStyle::None, bare)
        } else {
            continue;
        };

        if whole.start() > cursor {
            tokens.push(UrlToken::Literal(value[cursor..whole.start()].to_string()));
        }

        let open = caps.get(1).map_or("", |m| m.as_str());
        let close = caps.get(5).map_or("", |m| m.as_str());
        tokens.push(UrlToken::Url(UrlReference {
            open: open.to_string(),
            quote,
            uri: payload.as_str().to_string(),
            close: close.to_string(),
            offset: payload.start(),
        }));
        cursor = whole.end();
    }

    if cursor < value.len() {
        tokens.push(UrlToken::Literal(value[cursor..].to_string()));
    }

    tokens
}

/// Reassemble tokens into a value.
pub fn join(tokens: &[UrlToken]) -> String {
    tokens.iter().map(ToString::to_string).collect()
}
