//! End-to-end tests for the HTTP API.
//!
//! Each test starts the real server on a free port, backed by a seeded
//! [`MemoryStore`] and a scratch catalog, and talks to it with `reqwest`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use slow_morocco::catalog::{Catalog, CatalogExport};
use slow_morocco::config::{load_config, Config};
use slow_morocco::models::{Row, StoryInput};
use slow_morocco::server::run_server_with_store;
use slow_morocco::store::{collections, ContentStore, MemoryStore};
use std::sync::Arc;
use tempfile::TempDir;

// ─── Test doubles ───────────────────────────────────────────────────

/// Store whose backend is always down.
struct OfflineStore;

#[async_trait]
impl ContentStore for OfflineStore {
    fn name(&self) -> &str {
        "offline"
    }

    async fn fetch_rows(&self, collection: &str) -> Result<Vec<Row>> {
        anyhow::bail!("sheet '{}' unreachable", collection)
    }

    async fn append_rows(&self, collection: &str, _rows: Vec<Vec<String>>) -> Result<()> {
        anyhow::bail!("sheet '{}' unreachable", collection)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn test_config(tmp: &TempDir, port: u16) -> Config {
    let path = tmp.path().join("site.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[server]
bind = "127.0.0.1:{port}"

[sheets]
spreadsheet_id = "test-sheet"

[db]
path = "{db}"

[relevance]
related_stories_limit = 4
related_journeys_limit = 3
story_related_limit = 2
max_limit = 5
"#,
            port = port,
            db = tmp.path().join("catalog.sqlite").display()
        ),
    )
    .unwrap();
    load_config(&path).unwrap()
}

/// A `Stories` row in the sheet's column order.
fn story(
    slug: &str,
    title: &str,
    category: &str,
    tags: &str,
    region: &str,
    published: &str,
    order: &str,
) -> Vec<String> {
    StoryInput {
        slug: slug.to_string(),
        title: title.to_string(),
        category: category.to_string(),
        tags: tags.to_string(),
        region: region.to_string(),
        published: published.to_string(),
        order: order.to_string(),
        ..Default::default()
    }
    .to_row()
}

async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .seed_str(
            collections::WEBSITE_JOURNEYS,
            &[
                &[
                    "Slug",
                    "Title",
                    "Duration_Days",
                    "Short_Description",
                    "Price_EUR",
                    "Focus_Type",
                    "Category",
                    "Destinations",
                    "Published",
                ],
                &[
                    "desert-crossing",
                    "Desert Crossing",
                    "7",
                    "Dunes and kasbahs",
                    "2400",
                    "desert",
                    "Adventure",
                    "Merzouga, Ouarzazate",
                    "TRUE",
                ],
                &[
                    "imperial-cities",
                    "Imperial Cities",
                    "10",
                    "Fes, Meknes, Rabat",
                    "3100",
                    "history",
                    "Culture",
                    "Fes, Meknes, Rabat",
                    "true",
                ],
                &[
                    "secret-draft",
                    "Secret Draft",
                    "",
                    "",
                    "",
                    "desert",
                    "Adventure",
                    "Merzouga",
                    "",
                ],
            ],
        )
        .await;
    store
        .seed(
            collections::STORIES,
            vec![
                StoryInput::COLUMNS.iter().map(|c| c.to_string()).collect(),
                story("sand-sea", "The Sand Sea", "Nature", "desert, dunes", "Merzouga", "true", "2"),
                story("gnawa", "Gnawa Nights", "Music", "music, desert", "Merzouga", "true", "1"),
                story("fes-tanneries", "The Tanneries", "Craft", "leather", "Fes", "true", ""),
                story("unpublished", "Unpublished", "Nature", "desert", "Merzouga", "false", "0"),
            ],
        )
        .await;
    store
        .seed_str(
            collections::STORY_IMAGES,
            &[
                &["story_slug", "image_order", "image_url", "caption"],
                &["sand-sea", "2", "https://img.example/2.jpg", "Dusk"],
                &["sand-sea", "1", "https://img.example/1.jpg", "Dawn"],
                &["gnawa", "1", "https://img.example/g.jpg", "Drums"],
            ],
        )
        .await;
    store
        .seed_str(
            collections::PAGE_BANNERS,
            &[
                &["page_slug", "hero_image_url", "title"],
                &["journeys", "https://img.example/journeys.jpg", "Journeys"],
                &["stories", "https://img.example/stories.jpg", "Stories"],
            ],
        )
        .await;
    store
        .seed_str(
            collections::GENTLE_SETTINGS,
            &[
                &["Key", "Value"],
                &["requirement_insurance", "Bring proof of cover"],
            ],
        )
        .await;
    store
}

async fn seed_catalog(cfg: &Config) {
    let export: CatalogExport = serde_json::from_value(json!({
        "journeys": [
            {"id": "j1", "title": "Atlas Loop", "slug": "atlas-loop", "duration_days": 5,
             "published": true, "show_on_journeys_page": true, "category": "Mountains"},
            {"id": "j2", "title": "Coast Road", "slug": "coast-road", "duration_days": 3,
             "published": true, "show_on_journeys_page": false},
            {"id": "j3", "title": "Draft", "slug": "draft", "duration_days": 1}
        ],
        "routes": [
            {"id": "fes-merzouga", "from_city": "Fes", "to_city": "Merzouga", "region": "Sahara"},
            {"id": "merzouga-dades", "from_city": "Merzouga", "to_city": "Dades", "region": "Sahara"},
            {"id": "imlil-day", "from_city": "Marrakech", "to_city": "Imlil", "region": "Atlas"}
        ]
    }))
    .unwrap();
    let catalog = Catalog::open(cfg).await.unwrap();
    catalog.import(&export).await.unwrap();
    catalog.close().await;
}

/// Start a server over `store` and return its base URL.
async fn start(tmp: &TempDir, store: Arc<dyn ContentStore>) -> String {
    let port = find_free_port();
    let cfg = test_config(tmp, port);
    seed_catalog(&cfg).await;

    tokio::spawn(async move {
        let _ = run_server_with_store(&cfg, store).await;
    });
    wait_for_server(port).await;
    format!("http://127.0.0.1:{}", port)
}

async fn get_json(url: &str) -> (u16, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

fn slugs(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|v| v["slug"].as_str().unwrap().to_string())
        .collect()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_and_cache_headers() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp, Arc::new(seeded_store().await)).await;

    let (status, body) = get_json(&format!("{}/health", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");

    let resp = reqwest::get(format!("{}/api/stories", base)).await.unwrap();
    assert_eq!(
        resp.headers().get("cache-control").unwrap().to_str().unwrap(),
        "no-store"
    );
}

#[tokio::test]
async fn test_journeys_hide_unpublished_unless_asked() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp, Arc::new(seeded_store().await)).await;

    let (status, body) = get_json(&format!("{}/api/journeys", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(slugs(&body["journeys"]), vec!["desert-crossing", "imperial-cities"]);
    assert_eq!(body["journeys"][0]["duration"], "7-Day");
    assert_eq!(body["journeys"][0]["price"], 2400);

    let (_, body) = get_json(&format!("{}/api/journeys?includeHidden=true", base)).await;
    let journeys = body["journeys"].as_array().unwrap();
    assert_eq!(journeys.len(), 3);
    assert_eq!(journeys[2]["hidden"], true);
    assert_eq!(journeys[2]["duration"], "");
}

#[tokio::test]
async fn test_story_detail_with_images_and_related() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp, Arc::new(seeded_store().await)).await;

    let (_, body) = get_json(&format!("{}/api/stories", base)).await;
    assert_eq!(
        slugs(&body["stories"]),
        vec!["gnawa", "sand-sea", "fes-tanneries"]
    );

    let (status, body) = get_json(&format!("{}/api/stories/sand-sea", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["story"]["title"], "The Sand Sea");
    let captions: Vec<&str> = body["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["caption"].as_str().unwrap())
        .collect();
    assert_eq!(captions, vec!["Dawn", "Dusk"]);
    assert_eq!(slugs(&body["related"]), vec!["gnawa"]);

    let (status, body) = get_json(&format!("{}/api/stories/unpublished", base)).await;
    assert_eq!(status, 404);
    assert!(body["story"].is_null());
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_related_stories_ranking_and_limits() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp, Arc::new(seeded_store().await)).await;

    let (status, body) = get_json(&format!("{}/api/related-stories", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "stories": [] }));

    let (_, body) = get_json(&format!(
        "{}/api/related-stories?destinations=Merzouga&focus=music",
        base
    ))
    .await;
    assert_eq!(slugs(&body["stories"]), vec!["gnawa", "sand-sea"]);

    let (_, body) = get_json(&format!(
        "{}/api/related-stories?destinations=Merzouga,Fes&limit=1",
        base
    ))
    .await;
    assert_eq!(body["stories"].as_array().unwrap().len(), 1);

    let (_, body) = get_json(&format!(
        "{}/api/related-stories?destinations=Merzouga,Fes&limit=999",
        base
    ))
    .await;
    assert_eq!(body["stories"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_related_journeys_excludes_unpublished() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp, Arc::new(seeded_store().await)).await;

    let (_, body) = get_json(&format!(
        "{}/api/related-journeys?region=Merzouga&tags=desert",
        base
    ))
    .await;
    assert_eq!(slugs(&body["journeys"]), vec!["desert-crossing"]);
}

#[tokio::test]
async fn test_page_banners_and_gentle_settings() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp, Arc::new(seeded_store().await)).await;

    let (_, body) = get_json(&format!("{}/api/page-banners", base)).await;
    assert_eq!(body["banners"].as_array().unwrap().len(), 2);

    let (_, body) = get_json(&format!("{}/api/page-banners?slug=stories", base)).await;
    assert_eq!(body["banner"]["title"], "Stories");

    let (_, body) = get_json(&format!("{}/api/page-banners?slug=nope", base)).await;
    assert!(body["banner"].is_null());

    let (status, body) = get_json(&format!("{}/api/gentle-journeys", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["journeys"], json!([]));
    let requirements = body["settings"]["requirements"].as_array().unwrap();
    assert_eq!(requirements.len(), 1);
    assert_eq!(requirements[0]["description"], "Bring proof of cover");
}

#[tokio::test]
async fn test_overnight_booking_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(seeded_store().await);
    let base = start(&tmp, store.clone()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/overnight-booking", base))
        .json(&json!({
            "experienceTitle": "Agafay Desert Overnight",
            "tripDate": "2026-11-02",
            "guestName": "Sam Idrissi",
            "guestEmail": "sam@example.com",
            "pickupLocation": "Jemaa el-Fna",
            "subtotalEUR": 300,
            "handlingFeeEUR": 9,
            "totalEUR": 309,
            "transactionId": "txn_1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Booking confirmed");
    let reference = body["bookingRef"].as_str().unwrap().to_string();
    assert!(reference.starts_with("ON-"));

    let rows = store
        .fetch_rows(collections::OVERNIGHT_BOOKINGS)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["col_1"], reference);
    assert_eq!(rows[0]["col_14"], "confirmed");

    let resp = client
        .post(format!("{}/api/overnight-booking", base))
        .json(&json!({ "experienceTitle": "Agafay Desert Overnight" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn test_add_stories_skips_duplicates() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(seeded_store().await);
    let base = start(&tmp, store.clone()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/stories/add", base))
        .json(&json!({
            "stories": [
                {"slug": "sand-sea", "title": "Duplicate"},
                {"slug": "kasbah-roads", "title": "Kasbah Roads", "region": "Dades", "published": "true"},
                {"slug": "kasbah-roads", "title": "Again"},
                {"title": "No slug"}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Added 1 stories");
    assert_eq!(body["slugs"], json!(["kasbah-roads"]));

    let (_, body) = get_json(&format!("{}/api/stories/kasbah-roads", base)).await;
    assert_eq!(body["story"]["region"], "Dades");

    let resp = client
        .post(format!("{}/api/stories/add", base))
        .json(&json!({ "stories": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "stories array is required");
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp, Arc::new(MemoryStore::new())).await;

    let (_, body) = get_json(&format!("{}/api/catalog/journeys", base)).await;
    assert_eq!(slugs(&body["journeys"]), vec!["coast-road", "atlas-loop"]);
    assert_eq!(body["journeys"][0]["hidden"], true);
    assert_eq!(body["journeys"][1]["durationDays"], 5);

    let (_, body) = get_json(&format!(
        "{}/api/catalog/journeys?includeHidden=true&category=Mountains",
        base
    ))
    .await;
    assert_eq!(slugs(&body["journeys"]), vec!["atlas-loop"]);

    let (status, body) = get_json(&format!("{}/api/catalog/journeys/atlas-loop", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["journey"]["title"], "Atlas Loop");

    let (status, _) = get_json(&format!("{}/api/catalog/journeys/missing", base)).await;
    assert_eq!(status, 404);

    let (_, body) = get_json(&format!("{}/api/catalog/routes?region=Sahara", base)).await;
    assert_eq!(body["routes"].as_array().unwrap().len(), 2);

    let (_, body) = get_json(&format!(
        "{}/api/catalog/routes?ids=merzouga-dades,unknown,fes-merzouga",
        base
    ))
    .await;
    let ids: Vec<&str> = body["routes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["merzouga-dades", "fes-merzouga"]);

    let (status, body) = get_json(&format!("{}/api/catalog/routes/imlil-day", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["route"]["toCity"], "Imlil");
}

#[tokio::test]
async fn test_store_failure_returns_empty_payload_with_error() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp, Arc::new(OfflineStore)).await;

    let (status, body) = get_json(&format!("{}/api/journeys", base)).await;
    assert_eq!(status, 500);
    assert_eq!(body["success"], false);
    assert_eq!(body["journeys"], json!([]));
    assert_eq!(body["error"], "Failed to fetch journeys");

    let (status, body) = get_json(&format!("{}/api/gentle-journeys", base)).await;
    assert_eq!(status, 500);
    assert_eq!(body["team"], json!([]));
    assert_eq!(body["settings"], json!({}));

    let (status, body) = get_json(&format!(
        "{}/api/related-stories?destinations=Fes",
        base
    ))
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["stories"], json!([]));

    let resp = reqwest::Client::new()
        .post(format!("{}/api/stories/add", base))
        .json(&json!({ "stories": [{"slug": "a", "title": "A"}] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(seeded_store().await);
    let base = start(&tmp, store.clone()).await;
    let client = reqwest::Client::new();

    // `stories: null` reads as an empty batch.
    let resp = client
        .post(format!("{}/api/stories/add", base))
        .json(&json!({ "stories": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "stories array is required");

    let resp = client
        .post(format!("{}/api/stories/add", base))
        .json(&json!({ "stories": "sand-sea" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "bad_request");
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));

    // No Content-Type header at all.
    let resp = client
        .post(format!("{}/api/overnight-booking", base))
        .body(r#"{"experienceTitle": "Agafay Desert Overnight"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let resp = client
        .post(format!("{}/api/overnight-booking", base))
        .json(&json!({
            "experienceTitle": null,
            "tripDate": "2026-11-02",
            "guestName": "Sam Idrissi",
            "guestEmail": "sam@example.com"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Missing required fields");

    let (status, body) =
        get_json(&format!("{}/api/catalog/journeys?published=maybe", base)).await;
    assert_eq!(status, 400);
    assert_eq!(body["journeys"], json!([]));
    assert!(body["error"].as_str().unwrap().starts_with("Invalid query string"));

    assert!(store
        .fetch_rows(collections::OVERNIGHT_BOOKINGS)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_overnight_booking_accepts_numeric_transaction_id() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(seeded_store().await);
    let base = start(&tmp, store.clone()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/overnight-booking", base))
        .json(&json!({
            "experienceTitle": "Agafay Desert Overnight",
            "tripDate": "2026-11-02",
            "guestName": "Sam Idrissi",
            "guestEmail": "sam@example.com",
            "guestPhone": null,
            "pickupLocation": "Jemaa el-Fna",
            "totalEUR": 309.5,
            "transactionId": 12345
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let rows = store
        .fetch_rows(collections::OVERNIGHT_BOOKINGS)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["col_7"], "");
    assert_eq!(rows[0]["col_12"], "309.5");
    assert_eq!(rows[0]["col_13"], "12345");
}

#[tokio::test]
async fn test_visibility_flags_need_literal_true() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(seeded_store().await);
    store
        .append_rows(
            collections::STORIES,
            vec![
                story("souk-yes", "Souk Yes", "Craft", "desert", "Merzouga", "yes", "5"),
                story("souk-upper", "Souk Upper", "Craft", "desert", "Merzouga", "TRUE", "6"),
            ],
        )
        .await
        .unwrap();
    let base = start(&tmp, store).await;

    let (_, body) = get_json(&format!("{}/api/journeys?includeHidden=1", base)).await;
    assert_eq!(slugs(&body["journeys"]), vec!["desert-crossing", "imperial-cities"]);

    let (_, body) = get_json(&format!(
        "{}/api/related-stories?destinations=Merzouga&limit=5",
        base
    ))
    .await;
    let related = slugs(&body["stories"]);
    assert!(related.contains(&"souk-upper".to_string()));
    assert!(!related.contains(&"souk-yes".to_string()));
}
