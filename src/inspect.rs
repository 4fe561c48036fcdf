//! CLI helpers for looking at live content and loading the catalog.
//!
//! - `slowmo rows <collection>` prints a collection's rows with normalized
//!   headers, which is the quickest way to see why a sheet column is not
//!   being picked up.
//! - `slowmo related --destinations ..` runs the related-stories ranking
//!   against the live `Stories` collection.
//! - `slowmo import-catalog <file>` upserts journeys and routes from a JSON
//!   export into the catalog.

use anyhow::{Context, Result};
use std::path::Path;

use crate::catalog::{Catalog, CatalogExport};
use crate::config::Config;
use crate::connector_sheets::SheetsStore;
use crate::models::{Row, StoryCard};
use crate::normalize;
use crate::relevance;
use crate::store::{collections, normalize_row, ContentStore};

pub async fn run_rows(config: &Config, collection: &str, limit: Option<usize>) -> Result<()> {
    let store = SheetsStore::new(config.sheets.clone())?;
    let rows = store.fetch_rows(collection).await?;
    let shown: Vec<Row> = rows
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(normalize_row)
        .collect();

    eprintln!("{}: {} rows ({} shown)", collection, rows.len(), shown.len());
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

/// Rank published stories from `store` for a journey's destinations/focus.
pub async fn related_for(
    store: &dyn ContentStore,
    destinations: &str,
    focus: &str,
    limit: usize,
) -> Result<Vec<StoryCard>> {
    let rows = store.fetch_rows(collections::STORIES).await?;
    let cards: Vec<StoryCard> = normalize::published_stories(&rows)
        .iter()
        .map(StoryCard::from)
        .collect();
    Ok(relevance::related_stories(destinations, focus, cards, limit))
}

pub async fn run_related(
    config: &Config,
    destinations: &str,
    focus: &str,
    limit: Option<usize>,
) -> Result<()> {
    let store = SheetsStore::new(config.sheets.clone())?;
    let limit = config.relevance.clamp(
        limit.map(|n| n as i64),
        config.relevance.related_stories_limit,
    );
    let related = related_for(&store, destinations, focus, limit).await?;

    if related.is_empty() {
        println!("No related stories.");
        return Ok(());
    }
    for (i, card) in related.iter().enumerate() {
        println!("{}. {} ({})", i + 1, card.title, card.slug);
        println!("   region: {}  tags: {}", card.region, card.tags);
    }
    Ok(())
}

pub fn read_export(path: &Path) -> Result<CatalogExport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog export: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog export: {}", path.display()))
}

pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let export = read_export(path)?;
    let catalog = Catalog::open(config).await?;
    let (journeys, routes) = catalog.import(&export).await?;
    catalog.close().await;
    println!("Imported {} journeys and {} routes.", journeys, routes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io::Write;

    #[tokio::test]
    async fn test_related_for_uses_published_stories() {
        let store = MemoryStore::new();
        store
            .seed_str(
                collections::STORIES,
                &[
                    &["slug", "title", "region", "tags", "published", "order"],
                    &["dunes", "Dunes", "Sahara", "desert", "true", "2"],
                    &["draft", "Draft", "Sahara", "desert", "false", "1"],
                    &["fes", "Fes", "Fes", "medina", "true", "1"],
                ],
            )
            .await;

        let related = related_for(&store, "Sahara", "", 4).await.unwrap();
        let slugs: Vec<&str> = related.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["dunes"]);
    }

    #[test]
    fn test_read_export() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"journeys": [{{"id": "j1", "title": "Atlas", "slug": "atlas", "published": true}}],
                "routes": [{{"id": "r1", "region": "Atlas", "travel_time_hours": 3.5}}]}}"#
        )
        .unwrap();
        let export = read_export(f.path()).unwrap();
        assert_eq!(export.journeys.len(), 1);
        assert!(export.journeys[0].published);
        assert_eq!(export.routes[0].travel_time_hours, Some(3.5));
    }

    #[test]
    fn test_read_export_missing_file() {
        let err = read_export(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read catalog export"));
    }
}
