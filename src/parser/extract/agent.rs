use crate::parser::anchors::Anchor;
use crate::parser::{descendants_by_tag, first_in, text_of, Page};
use crate::record::FieldMap;
use crate::text::capitalize;

pub const AUTHOR: &str = "Автор ID/Имя";
pub const ON_SITE: &str = "На ЦИАН";
pub const OFFER_COUNT: &str = "Объявлений автора";
pub const OFFER_COUNT_TEXT: &str = "Объявлений автора (текст)";

pub fn extract(page: &Page) -> Option<FieldMap> {
    let block = page.first(Anchor::AgentInfo)?;
    let mut map = FieldMap::new();

    if let Some(name) = first_in(block, Anchor::AgentName)
        .and_then(|a| first_in(a, Anchor::BrandText).or_else(|| descendants_by_tag(a, "span").next()))
        .map(text_of)
        .filter(|n| !n.is_empty())
    {
        map.insert(AUTHOR, name);
    }

    if let Some(lifetime) = first_in(block, Anchor::AgentLifeTimeContainer)
        .and_then(|c| first_in(c, Anchor::AgentLifeTime))
        .map(|el| text_of(el).to_lowercase().replace("на циан", ""))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
    {
        map.insert(ON_SITE, capitalize(&lifetime));
    }

    if let Some(offers) = first_in(block, Anchor::MoreOffers)
        .and_then(|li| descendants_by_tag(li, "a").next())
        .map(|a| descendants_by_tag(a, "span").next().map_or_else(|| text_of(a), text_of))
        .filter(|t| !t.is_empty())
    {
        match offers.split_whitespace().next() {
            Some(count) if count.chars().all(|c| c.is_ascii_digit()) => map.insert(OFFER_COUNT, count),
            _ => map.insert(OFFER_COUNT_TEXT, offers.as_str()),
        }
    }

    map.non_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(inner: &str) -> FieldMap {
        let page = Page::parse(&format!(r#"<div data-name="AgentInfo">{}</div>"#, inner));
        extract(&page).unwrap()
    }

    #[test]
    fn full_agent_block() {
        let info = agent(
            r#"<a class="q_agent-name" href="/agent"><span class="q_text--x">ID 12345678</span></a>
               <ul>
                 <li data-name="AgentLifeTimeContainer"><span data-name="AgentLifeTime">На ЦИАН 6 лет 6 месяцев</span></li>
                 <li data-name="MoreOffers"><a href="/offers"><span>14 объявлений</span></a></li>
               </ul>"#,
        );
        assert_eq!(info.get(AUTHOR), Some("ID 12345678"));
        assert_eq!(info.get(ON_SITE), Some("6 лет 6 месяцев"));
        assert_eq!(info.get(OFFER_COUNT), Some("14"));
    }

    #[test]
    fn non_numeric_offer_count_kept_as_text() {
        let info = agent(r#"<ul><li data-name="MoreOffers"><a><span>Все объявления</span></a></li></ul>"#);
        assert_eq!(info.get(OFFER_COUNT_TEXT), Some("Все объявления"));
        assert!(!info.contains_key(OFFER_COUNT));
    }

    #[test]
    fn empty_block_is_absent() {
        let page = Page::parse(r#"<div data-name="AgentInfo"><p>no data</p></div>"#);
        assert!(extract(&page).is_none());
    }
}
