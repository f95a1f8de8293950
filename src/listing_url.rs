use std::sync::LazyLock;

use regex::Regex;

static LISTING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https://www\.cian\.ru/sale/flat/(\d+)/?$").unwrap());

/// Example shown to users who send something else.
pub const EXAMPLE_URL: &str = "https://www.cian.ru/sale/flat/123456789/";

/// Whether `url` is a flat-sale listing URL the bot accepts.
pub fn is_listing_url(url: &str) -> bool {
    LISTING_RE.is_match(url.trim())
}

/// Listing id: the URL's last non-empty path segment.
pub fn listing_id(url: &str) -> Option<String> {
    let path = url.trim().split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_flat_sale_urls() {
        assert!(is_listing_url("https://www.cian.ru/sale/flat/312256069/"));
        assert!(is_listing_url("https://www.cian.ru/sale/flat/312256069"));
        assert!(is_listing_url("  HTTPS://WWW.CIAN.RU/sale/flat/1/ "));
    }

    #[test]
    fn rejects_other_urls() {
        assert!(!is_listing_url("https://www.cian.ru/rent/flat/312256069/"));
        assert!(!is_listing_url("http://www.cian.ru/sale/flat/312256069/"));
        assert!(!is_listing_url("https://www.cian.ru/sale/flat/abc/"));
        assert!(!is_listing_url("hello"));
    }

    #[test]
    fn id_is_trailing_segment() {
        assert_eq!(listing_id("https://www.cian.ru/sale/flat/312256069/").as_deref(), Some("312256069"));
        assert_eq!(listing_id("https://www.cian.ru/sale/flat/316598899").as_deref(), Some("316598899"));
        assert_eq!(listing_id("http://127.0.0.1:1234/listing/42?x=1").as_deref(), Some("42"));
        assert_eq!(listing_id("https://").as_deref(), None);
    }
}
