//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Parse the digits of `text`, ignoring everything else.
///
/// No digits gives 0; values too large for `u32` saturate.
pub fn parse_digits(text: &str) -> u32 {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u32::MAX)
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://1337x.to/").unwrap();
        assert_eq!(
            resolve_url(&base, "/torrent/42/Some-Movie/"),
            "https://1337x.to/torrent/42/Some-Movie/"
        );
        assert_eq!(
            resolve_url(&base, "cat/TV/2/"),
            "https://1337x.to/cat/TV/2/"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_parse_digits() {
        assert_eq!(parse_digits(" 1,234 "), 1234);
        assert_eq!(parse_digits("n/a"), 0);
        assert_eq!(parse_digits(""), 0);
        assert_eq!(parse_digits("99999999999"), u32::MAX);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Some \n\t Movie  "), "Some Movie");
    }
}
