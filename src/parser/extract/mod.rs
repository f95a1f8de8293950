pub mod address;
pub mod agent;
pub mod branding;
pub mod description;
pub mod developer;
pub mod images;
pub mod metadata;
pub mod metro;
pub mod offer;
pub mod params;
pub mod price;
pub mod rosreestr;
pub mod title;

use chrono::NaiveDateTime;
use tracing::debug;

use super::Page;
use crate::record::{ImageSlot, ListingRecord};

/// Run every extractor over `page`. Never fails: a missing field is `None`.
///
/// Images come back as slots with source URLs only; downloading fills in the paths.
pub fn extract_all(id: &str, url: &str, page: &Page, now: NaiveDateTime) -> ListingRecord {
    let images = images::extract(page)
        .into_iter()
        .map(|source_url| ImageSlot {
            local_path: None,
            source_url,
        })
        .collect::<Vec<_>>();
    if images.is_empty() {
        debug!(listing_id = id, field = "images", "field absent");
    }

    ListingRecord {
        id: id.to_string(),
        url: url.to_string(),
        title: field(id, "title", title::extract(page)),
        address: field(id, "address", address::extract(page)),
        price: field(id, "price", price::extract(page)),
        offer_facts: field(id, "offer_facts", offer::extract(page)),
        metro: field(id, "metro", metro::extract(page)),
        parameters: field(id, "parameters", params::extract(page)),
        developer_info: field(id, "developer_info", developer::extract(page)),
        rosreestr_info: field(id, "rosreestr_info", rosreestr::extract(page)),
        agent_info: field(id, "agent_info", agent::extract(page)),
        author_branding: field(id, "author_branding", branding::extract(page)),
        offer_metadata: field(id, "offer_metadata", metadata::extract(page, now)),
        description: field(id, "description", description::extract(page)),
        images,
    }
}

fn field<T>(listing_id: &str, name: &'static str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        debug!(listing_id, field = name, "field absent");
    }
    value
}
