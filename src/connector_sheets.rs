//! Google Sheets connector.
//!
//! Reads and appends spreadsheet tabs through the Sheets v4 REST API. Each
//! collection is one tab; the first row of the tab is its header.
//!
//! # Configuration
//!
//! ```toml
//! [sheets]
//! spreadsheet_id = "1AbC..."
//! api_base = "https://sheets.googleapis.com"   # override for a local stub
//! timeout_secs = 15
//! ```
//!
//! # Credentials
//!
//! Credentials are never minted here. Reads accept an API key
//! (`SHEETS_API_KEY`, sent as `?key=`); writes need a pre-issued OAuth
//! bearer token (`SHEETS_ACCESS_TOKEN`). When both are set the token wins.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::SheetsConfig;
use crate::models::Row;
use crate::store::{rows_from_values, ContentStore};

/// Columns fetched from every tab.
const COLUMN_SPAN: &str = "A:Z";

/// [`ContentStore`] backed by one Google spreadsheet.
pub struct SheetsStore {
    config: SheetsConfig,
    client: reqwest::Client,
}

impl SheetsStore {
    pub fn new(config: SheetsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for Sheets")?;
        Ok(Self { config, client })
    }

    /// `{api_base}/v4/spreadsheets/{id}/values/{tab}!A:Z{suffix}`
    fn values_url(&self, collection: &str, suffix: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_base)
            .with_context(|| format!("Invalid sheets.api_base: {}", self.config.api_base))?;
        let range = format!("{}!{}{}", collection, COLUMN_SPAN, suffix);
        url.path_segments_mut()
            .map_err(|_| anyhow!("sheets.api_base cannot be a base URL"))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.config.spreadsheet_id.as_str(),
                "values",
                range.as_str(),
            ]);
        Ok(url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref token) = self.config.access_token {
            req.bearer_auth(token)
        } else if let Some(ref key) = self.config.api_key {
            req.query(&[("key", key)])
        } else {
            req
        }
    }
}

/// Body of a `values.get` response.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Cells come back as strings for formatted values, but numbers and
/// booleans show up when a tab uses unformatted rendering.
fn cell_to_string(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_value_range(body: &str) -> Result<Vec<Row>> {
    let range: ValueRange =
        serde_json::from_str(body).context("Failed to parse Sheets values response")?;
    let values = range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect())
        .collect();
    Ok(rows_from_values(values))
}

async fn check_status(resp: reqwest::Response, what: &str) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        bail!(
            "{} failed (HTTP {}): {}",
            what,
            status,
            body.chars().take(500).collect::<String>()
        );
    }
    Ok(body)
}

#[async_trait]
impl ContentStore for SheetsStore {
    fn name(&self) -> &str {
        "sheets"
    }

    async fn fetch_rows(&self, collection: &str) -> Result<Vec<Row>> {
        let url = self.values_url(collection, "")?;
        debug!(collection, "fetching sheet values");

        let resp = self
            .authorize(self.client.get(url))
            .send()
            .await
            .with_context(|| format!("Failed to fetch sheet '{}'", collection))?;

        let body = check_status(resp, &format!("Sheets read of '{}'", collection)).await?;
        parse_value_range(&body)
    }

    async fn append_rows(&self, collection: &str, rows: Vec<Vec<String>>) -> Result<()> {
        if self.config.access_token.is_none() {
            bail!("Appending to sheets requires an access token (SHEETS_ACCESS_TOKEN)");
        }
        let url = self.values_url(collection, ":append")?;
        debug!(collection, rows = rows.len(), "appending sheet rows");

        let resp = self
            .authorize(self.client.post(url))
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&serde_json::json!({ "values": rows }))
            .send()
            .await
            .with_context(|| format!("Failed to append to sheet '{}'", collection))?;

        check_status(resp, &format!("Sheets append to '{}'", collection)).await?;
        Ok(())
    }
}
