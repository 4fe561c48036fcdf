//! Content store abstraction.
//!
//! A [`ContentStore`] serves named collections (one spreadsheet tab each) as
//! lists of [`Row`]s and accepts appended rows. The HTTP layer only talks to
//! this trait, so handlers run unchanged against the Google Sheets backend
//! ([`crate::connector_sheets::SheetsStore`]) or the in-process
//! [`MemoryStore`] used by tests and local demos.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::Row;

/// Collection names used by the site.
pub mod collections {
    pub const WEBSITE_JOURNEYS: &str = "Website_Journeys";
    pub const GENTLE_JOURNEYS: &str = "Gentle_Journeys";
    pub const WEBSITE_TEAM: &str = "Website_Team";
    pub const GENTLE_SETTINGS: &str = "Gentle_Settings";
    pub const PAGE_BANNERS: &str = "Page_Banners";
    pub const STORIES: &str = "Stories";
    pub const STORY_IMAGES: &str = "Story_Images";
    pub const PLACES: &str = "Places";
    pub const DAY_TRIPS: &str = "DayTrips";
    pub const OVERNIGHT_BOOKINGS: &str = "Overnight_Bookings";
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short backend label for logs (e.g. `"sheets"`, `"memory"`).
    fn name(&self) -> &str;

    /// All data rows of a collection, header row excluded.
    async fn fetch_rows(&self, collection: &str) -> Result<Vec<Row>>;

    /// Append positional rows to the end of a collection.
    async fn append_rows(&self, collection: &str, rows: Vec<Vec<String>>) -> Result<()>;
}

/// Lowercase a header and collapse whitespace runs into `_`.
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Re-key a row by [`normalize_header`].
pub fn normalize_row(row: &Row) -> Row {
    row.iter()
        .map(|(k, v)| (normalize_header(k), v.clone()))
        .collect()
}

/// Turn a header row plus value rows into keyed [`Row`]s.
///
/// Short rows are padded with `""`, cells beyond the header are dropped,
/// and rows with no non-blank cell are skipped.
pub fn rows_from_values(values: Vec<Vec<String>>) -> Vec<Row> {
    let mut iter = values.into_iter();
    let headers: Vec<String> = match iter.next() {
        Some(h) => h.iter().map(|s| s.trim().to_string()).collect(),
        None => return Vec::new(),
    };

    iter.filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|cells| {
            headers
                .iter()
                .enumerate()
                .filter(|(_, h)| !h.is_empty())
                .map(|(i, h)| (h.clone(), cells.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

#[derive(Debug, Default, Clone)]
struct Collection {
    headers: Vec<String>,
    rows: Vec<Row>,
}

/// In-process store. Collections that were never seeded read as empty.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection from sheet-shaped values (first row is the header).
    pub async fn seed(&self, collection: &str, values: Vec<Vec<String>>) {
        let headers = values
            .first()
            .map(|h| h.iter().map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();
        let rows = rows_from_values(values);
        self.collections
            .write()
            .await
            .insert(collection.to_string(), Collection { headers, rows });
    }

    /// Convenience for tests: seed from string slices.
    pub async fn seed_str(&self, collection: &str, values: &[&[&str]]) {
        let values = values
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        self.seed(collection, values).await;
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_rows(&self, collection: &str) -> Result<Vec<Row>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|c| c.rows.clone())
            .unwrap_or_default())
    }

    async fn append_rows(&self, collection: &str, rows: Vec<Vec<String>>) -> Result<()> {
        let mut guard = self.collections.write().await;
        let entry = guard.entry(collection.to_string()).or_default();
        for cells in rows {
            let row: Row = cells
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    let key = entry
                        .headers
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| format!("col_{}", i + 1));
                    (key, v)
                })
                .collect();
            entry.rows.push(row);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Hero  Image"), "hero_image");
        assert_eq!(normalize_header(" Published "), "published");
        assert_eq!(normalize_header("the_facts"), "the_facts");
    }

    #[test]
    fn test_normalize_row() {
        let row: Row = [("Hero Image", "a.jpg"), ("Slug", "fes")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let row = normalize_row(&row);
        assert_eq!(row["hero_image"], "a.jpg");
        assert_eq!(row["slug"], "fes");
    }

    #[test]
    fn test_rows_from_values_pads_and_skips_blank() {
        let rows = rows_from_values(values(&[
            &["Slug", "Title", "Published"],
            &["fes", "Fes el Bali"],
            &["", " ", ""],
            &["rabat", "Rabat", "true", "extra"],
        ]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Published"], "");
        assert_eq!(rows[1]["Published"], "true");
        assert_eq!(rows[1].len(), 3);
    }

    #[test]
    fn test_rows_from_values_empty_sheet() {
        assert!(rows_from_values(Vec::new()).is_empty());
        assert!(rows_from_values(values(&[&["Slug"]])).is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_append_uses_headers() {
        let store = MemoryStore::new();
        store.seed_str("Stories", &[&["slug", "title"]]).await;
        store
            .append_rows(
                "Stories",
                vec![vec!["a".into(), "A".into(), "overflow".into()]],
            )
            .await
            .unwrap();

        let rows = store.fetch_rows("Stories").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["slug"], "a");
        assert_eq!(rows[0]["title"], "A");
        assert_eq!(rows[0]["col_3"], "overflow");
    }

    #[tokio::test]
    async fn test_memory_store_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        assert!(store.fetch_rows("Nope").await.unwrap().is_empty());
    }
}
