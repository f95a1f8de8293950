use tracing::warn;

use crate::parser::anchors::Anchor;
use crate::parser::Page;
use crate::text::group_thousands;

pub const CURRENCY: &str = "₽";
pub const PRICE_NOT_SPECIFIED: &str = "Цена не указана";
const RENT_SUFFIX: &str = "₽/мес.";

/// Raw price as `<digits>₽`: whitespace removed, rent suffix cut back to the glyph.
pub fn extract(page: &Page) -> Option<String> {
    let el = page.first(Anchor::PriceAmount)?;
    let compact: String = el.text().flat_map(str::chars).filter(|c| !c.is_whitespace()).collect();
    let price = match compact.strip_suffix(RENT_SUFFIX) {
        Some(amount) => format!("{}{}", amount, CURRENCY),
        None => compact,
    };
    if price.is_empty() || price == CURRENCY {
        warn!("price anchor holds no amount");
        return None;
    }
    Some(price)
}

/// `21347430₽` -> `21 347 430 ₽`. Unparsable input comes back unchanged.
pub fn format_price(raw: &str) -> String {
    if raw.trim() == PRICE_NOT_SPECIFIED {
        return raw.to_string();
    }
    let digits: String = raw
        .replace(CURRENCY, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    match digits.parse::<i64>() {
        Ok(amount) => format!("{} {}", group_thousands(amount), CURRENCY),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_digits_with_glyph() {
        assert_eq!(format_price("21347430₽"), "21 347 430 ₽");
        assert_eq!(format_price("950000₽"), "950 000 ₽");
    }

    #[test]
    fn sentinel_and_garbage_pass_through() {
        assert_eq!(format_price("Цена не указана"), "Цена не указана");
        assert_eq!(format_price("abc₽"), "abc₽");
        assert_eq!(format_price(""), "");
    }

    #[test]
    fn format_is_idempotent() {
        for raw in ["21347430₽", "1₽", "1000₽", "21 347 430 ₽", "5\u{a0}100\u{a0}000 ₽"] {
            let once = format_price(raw);
            assert_eq!(format_price(&once), once, "not idempotent for {raw}");
        }
    }

    #[test]
    fn extracts_sale_price() {
        let page = Page::parse(r#"<div data-testid="price-amount"><span>21&nbsp;347&nbsp;430&nbsp;₽</span></div>"#);
        assert_eq!(extract(&page).as_deref(), Some("21347430₽"));
    }

    #[test]
    fn strips_rent_suffix() {
        let page = Page::parse(r#"<div data-testid="price-amount"><span>85 000 ₽/мес.</span></div>"#);
        assert_eq!(extract(&page).as_deref(), Some("85000₽"));
    }

    #[test]
    fn missing_or_empty_price_is_absent() {
        assert!(extract(&Page::parse("<p>nothing</p>")).is_none());
        assert!(extract(&Page::parse(r#"<div data-testid="price-amount"> ₽ </div>"#)).is_none());
    }
}
