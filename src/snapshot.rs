use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, warn};

use crate::record::ListingRecord;

#[derive(Serialize)]
struct Snapshot<'a> {
    generated_at: NaiveDateTime,
    #[serde(flatten)]
    record: &'a ListingRecord,
}

/// Pretty JSON of the record with a `generated_at` stamp, dates in ISO-8601.
pub fn to_json(record: &ListingRecord, at: NaiveDateTime) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Snapshot {
        generated_at: at,
        record,
    })
}

/// [`to_json`] written to `listing_<id>_<timestamp>.json`. Short-lived: the caller
/// deletes it once delivered.
pub fn write_snapshot(dir: &Path, record: &ListingRecord, at: NaiveDateTime) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("listing_{}_{}.json", record.id, at.format("%Y%m%d%H%M%S")));
    let json = to_json(record, at)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "snapshot written");
    Ok(path)
}

pub fn remove_snapshot(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "could not delete snapshot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::OfferMetadata;
    use chrono::NaiveDate;

    #[test]
    fn iso_dates_and_flat_fields() {
        let dir = tempfile::tempdir().unwrap();
        let at = NaiveDate::from_ymd_opt(2025, 5, 11).unwrap().and_hms_opt(12, 26, 0).unwrap();
        let record = ListingRecord {
            id: "312256069".into(),
            title: Some("Студия".into()),
            offer_metadata: Some(OfferMetadata {
                updated_date: Some("сегодня, 12:26".into()),
                updated_at: Some(at),
                ..OfferMetadata::default()
            }),
            ..ListingRecord::default()
        };

        let path = write_snapshot(dir.path(), &record, at).unwrap();
        assert!(path.ends_with("listing_312256069_20250511122600.json"));
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["generated_at"], "2025-05-11T12:26:00");
        assert_eq!(json["title"], "Студия");
        assert_eq!(json["offer_metadata"]["updated_at"], "2025-05-11T12:26:00");
        assert!(json["price"].is_null());

        remove_snapshot(&path);
        assert!(!path.exists());
    }
}
