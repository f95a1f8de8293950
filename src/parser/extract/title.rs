use crate::parser::anchors::Anchor;
use crate::parser::{text_of, Page};

pub fn extract(page: &Page) -> Option<String> {
    let el = page
        .first(Anchor::OfferTitle)
        .or_else(|| page.first(Anchor::LegacyTitle))?;
    let title = text_of(el);
    (!title.is_empty()).then_some(title)
}
