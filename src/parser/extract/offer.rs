use tracing::warn;

use crate::parser::anchors::Anchor;
use crate::parser::{all_in, descendants_by_tag, text_of, Page};
use crate::record::FieldMap;

/// Sidebar facts (price per metre, deal terms, mortgage). Each item is a label span
/// followed by a value span.
pub fn extract(page: &Page) -> Option<FieldMap> {
    let facts = page.first(Anchor::OfferFacts)?;
    let mut map = FieldMap::new();
    for item in all_in(facts, Anchor::OfferFactItem) {
        let spans: Vec<String> = descendants_by_tag(item, "span").map(text_of).collect();
        match spans.as_slice() {
            [label, value, ..] if !label.is_empty() => map.insert(label.as_str(), value.as_str()),
            _ => warn!(item = %text_of(item), "offer fact without label/value pair"),
        }
    }
    map.non_empty()
}
