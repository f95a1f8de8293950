use scraper::ElementRef;
use tracing::warn;

use crate::parser::anchors::Anchor;
use crate::parser::{all_in, first_in, text_of, Page};
use crate::record::FieldMap;
use crate::text::strip_unit;

const FLOOR_SEPARATOR: &str = " из ";

/// Structured apartment and building parameters.
///
/// Pages may carry the older factoid strip, the newer summary layout, or both.
/// Both are read and merged; the newer layout wins on a shared label.
pub fn extract(page: &Page) -> Option<FieldMap> {
    merge_parameters(legacy(page), current(page))
}

pub fn merge_parameters(legacy: Option<FieldMap>, current: Option<FieldMap>) -> Option<FieldMap> {
    let mut merged = legacy.unwrap_or_default();
    if let Some(current) = current {
        merged.merge(current);
    }
    merged.non_empty()
}

/// `ObjectFactoids` strip: label and value spans per item.
pub fn legacy(page: &Page) -> Option<FieldMap> {
    let factoids = page.first(Anchor::Factoids)?;
    let map: FieldMap = all_in(factoids, Anchor::FactoidItem)
        .filter_map(|item| pair(item, Anchor::FactoidLabel, Anchor::FactoidValue))
        .collect();
    map.non_empty()
}

/// `OfferSummaryInfoLayout` groups. Falls back to groups anywhere on the page.
pub fn current(page: &Page) -> Option<FieldMap> {
    let groups: Vec<ElementRef<'_>> = match page.first(Anchor::SummaryLayout) {
        Some(layout) => all_in(layout, Anchor::SummaryGroup).collect(),
        None => page.all(Anchor::SummaryGroup).collect(),
    };
    let map: FieldMap = groups
        .into_iter()
        .flat_map(|group| all_in(group, Anchor::SummaryItem))
        .filter_map(|item| pair(item, Anchor::SummaryLabel, Anchor::SummaryValue))
        .collect();
    map.non_empty()
}

fn pair(item: ElementRef<'_>, label: Anchor, value: Anchor) -> Option<(String, String)> {
    let (Some(label), Some(value)) = (first_in(item, label), first_in(item, value)) else {
        warn!(item = %text_of(item), "parameter item without label/value");
        return None;
    };
    let label = text_of(label);
    if label.is_empty() {
        return None;
    }
    let value = normalize_value(&label, &text_of(value));
    Some((label, value))
}

/// Area values lose `м²`, ceiling height loses `м`.
fn normalize_value(label: &str, value: &str) -> String {
    let label = label.to_lowercase();
    if label.contains("площад") {
        strip_unit(value, "м²")
    } else if label.contains("высота потолков") && value.contains(" м") {
        strip_unit(value, "м")
    } else {
        value.to_string()
    }
}

/// `"2 из 27"` -> `("2", "27")`; without the separator the total is `"?"`.
pub fn split_floor(floor: &str) -> (String, String) {
    match floor.split_once(FLOOR_SEPARATOR) {
        Some((current, total)) => (current.trim().to_string(), total.trim().to_string()),
        None => (floor.trim().to_string(), "?".to_string()),
    }
}
