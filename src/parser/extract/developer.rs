use scraper::ElementRef;
use tracing::warn;

use crate::parser::anchors::Anchor;
use crate::parser::{all_in, children_by_tag, children_matching, descendants_by_tag, first_in, text_of, Page};
use crate::record::FieldMap;

/// Newbuilding specifications merged with the developer card. The card wins on a
/// shared key.
pub fn extract(page: &Page) -> Option<FieldMap> {
    let mut info = FieldMap::new();
    if let Some(specs) = page.first(Anchor::NewbuildingSpecs) {
        info.merge(specifications(specs));
    }
    if let Some(layout) = page.first(Anchor::DeveloperLayout) {
        info.merge(developer_card(layout));
    }
    info.non_empty()
}

fn specifications(list: ElementRef<'_>) -> FieldMap {
    let mut map = FieldMap::new();
    for item in children_matching(list, Anchor::SpecItem) {
        let Some(title) = first_in(item, Anchor::SpecTitle) else {
            continue;
        };
        let Some(key) = descendants_by_tag(title, "span").next().map(text_of) else {
            continue;
        };
        let value = title
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| matches!(el.value().name(), "span" | "a"))
            .map(text_of);
        match value {
            Some(value) if !key.is_empty() => map.insert(key, value),
            _ => warn!(key = %key, "specification without value"),
        }
    }
    map
}

fn developer_card(layout: ElementRef<'_>) -> FieldMap {
    let mut map = FieldMap::new();

    let link = first_in(layout, Anchor::DeveloperLogo)
        .and_then(|logo| first_in(logo, Anchor::DeveloperLogoLink));
    if let Some(link) = link {
        let texts: Vec<String> = all_in(link, Anchor::BrandText).map(text_of).collect();
        if let [kind, name, ..] = texts.as_slice() {
            if kind.to_lowercase().contains("застройщик") {
                map.insert("Застройщик", name.as_str());
            }
        }
    }

    for stat in all_in(layout, Anchor::DeveloperStat) {
        let spans: Vec<String> = children_by_tag(stat, "span").map(text_of).collect();
        if let [key, value] = spans.as_slice() {
            if !key.is_empty() {
                map.insert(key.as_str(), value.as_str());
            }
        }
    }
    map
}
