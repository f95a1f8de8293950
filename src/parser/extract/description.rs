use crate::parser::anchors::Anchor;
use crate::parser::{descendants_by_tag, first_in, Page};

pub const LINE_BREAK: &str = "<br>";

/// Seller's free text with newlines encoded as `<br>`. Inner text is kept as typed.
pub fn extract(page: &Page) -> Option<String> {
    let content = page.first(Anchor::DescriptionContent)?;
    let text_el = first_in(content, Anchor::DescriptionText)
        .or_else(|| descendants_by_tag(content, "span").next())?;
    let raw: String = text_el.text().collect();
    let text = raw.replace("\r\n", "\n");
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.replace('\n', LINE_BREAK))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newlines_become_breaks() {
        let page = Page::parse(
            "<div data-id=\"content\"><span class=\"a_text_whiteSpace__pre-wrap\">\n Первая строка.\r\nВторая строка.\n</span></div>",
        );
        assert_eq!(extract(&page).as_deref(), Some("Первая строка.<br>Вторая строка."));
    }

    #[test]
    fn blank_description_is_absent() {
        let page = Page::parse(r#"<div data-id="content"><span>   </span></div>"#);
        assert!(extract(&page).is_none());
        assert!(extract(&Page::parse("<div></div>")).is_none());
    }
}
