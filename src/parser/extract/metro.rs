use tracing::warn;

use crate::parser::anchors::Anchor;
use crate::parser::{all_in, descendants_by_tag, first_in, text_fragments, text_of, Page};
use crate::record::{AccessMethod, MetroStop};

/// Nearby stations in page order. A walking icon (inline svg) next to the time means
/// the duration is on foot, otherwise by car.
pub fn extract(page: &Page) -> Option<Vec<MetroStop>> {
    let list = page.first(Anchor::UndergroundList)?;
    let stops: Vec<MetroStop> = all_in(list, Anchor::UndergroundItem)
        .filter_map(|item| {
            let station = first_in(item, Anchor::UndergroundStation)
                .or_else(|| descendants_by_tag(item, "a").next())
                .map(text_of)
                .filter(|s| !s.is_empty());
            let time = first_in(item, Anchor::UndergroundTime);
            let (Some(station), Some(time)) = (station, time) else {
                warn!(item = %text_of(item), "metro item without station or time");
                return None;
            };
            let access = if descendants_by_tag(time, "svg").next().is_some() {
                AccessMethod::Walk
            } else {
                AccessMethod::Drive
            };
            let duration = text_fragments(time).pop().unwrap_or_default();
            Some(MetroStop {
                station,
                access,
                duration,
            })
        })
        .collect();
    (!stops.is_empty()).then_some(stops)
}
