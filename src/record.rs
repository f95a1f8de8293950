use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Everything extracted from one listing page. Built fresh per run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListingRecord {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
    pub address: Option<String>,
    /// Raw `<digits>₽` form; formatting happens at render time.
    pub price: Option<String>,
    pub offer_facts: Option<FieldMap>,
    pub metro: Option<Vec<MetroStop>>,
    pub parameters: Option<FieldMap>,
    pub developer_info: Option<FieldMap>,
    pub rosreestr_info: Option<FieldMap>,
    pub agent_info: Option<FieldMap>,
    pub author_branding: Option<AuthorBranding>,
    pub offer_metadata: Option<OfferMetadata>,
    pub description: Option<String>,
    pub images: Vec<ImageSlot>,
}

impl ListingRecord {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.as_ref().and_then(|p| p.get(key))
    }

    pub fn offer(&self, key: &str) -> Option<&str> {
        self.offer_facts.as_ref().and_then(|o| o.get(key))
    }

    pub fn rosreestr(&self, key: &str) -> Option<&str> {
        self.rosreestr_info.as_ref().and_then(|r| r.get(key))
    }

    /// Local files of the images that actually downloaded, in page order.
    pub fn local_images(&self) -> impl Iterator<Item = &PathBuf> {
        self.images.iter().filter_map(|slot| slot.local_path.as_ref())
    }
}

/// Insertion-ordered string map. Re-inserting a key replaces the value in place,
/// so a later source overrides an earlier one without reordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap(Vec<(String, String)>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Apply every entry of `other`, letting it win on collisions.
    pub fn merge(&mut self, other: FieldMap) {
        for (k, v) in other.0 {
            self.insert(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `None` for an empty map, matching the extractor absence convention.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMethod {
    Walk,
    Drive,
}

impl fmt::Display for AccessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMethod::Walk => f.write_str("пешком"),
            AccessMethod::Drive => f.write_str("на машине"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetroStop {
    pub station: String,
    pub access: AccessMethod,
    pub duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorBranding {
    pub agency_type: Option<String>,
    pub agency_name: Option<String>,
    pub agency_link: Option<String>,
    pub agency_labels: Vec<String>,
    pub realtor_type: Option<String>,
    pub realtor_name: Option<String>,
    pub realtor_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OfferMetadata {
    /// As shown on the page, e.g. `вчера, 19:10`.
    pub updated_date: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
    pub views_stats: Option<String>,
    pub total_views: Option<u64>,
    pub views_today: Option<u64>,
    pub unique_views: Option<u64>,
}

/// One discovered image. `local_path` stays `None` when the download failed,
/// keeping `images[i]` aligned with the i-th source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSlot {
    pub local_path: Option<PathBuf>,
    pub source_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overrides_in_place() {
        let mut map = FieldMap::new();
        map.insert("Этаж", "2 из 27");
        map.insert("Дом", "Не сдан");
        map.insert("Этаж", "3 из 27");
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Этаж", "Дом"]);
        assert_eq!(map.get("Этаж"), Some("3 из 27"));
    }

    #[test]
    fn merge_later_wins() {
        let mut legacy: FieldMap = [("Этаж", "2 из 27")].into_iter().collect();
        let current: FieldMap = [("Этаж", "3 из 27"), ("Ремонт", "да")].into_iter().collect();
        legacy.merge(current);
        assert_eq!(legacy.get("Этаж"), Some("3 из 27"));
        assert_eq!(legacy.get("Ремонт"), Some("да"));
        assert_eq!(legacy.len(), 2);
    }

    #[test]
    fn serializes_as_ordered_object() {
        let map: FieldMap = [("b", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"b":"1","a":"2"}"#);
    }

    #[test]
    fn empty_map_is_absent() {
        assert!(FieldMap::new().non_empty().is_none());
    }
}
