//! TOML configuration.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [sheets]
//! spreadsheet_id = "1AbC..."
//! # api_key = "..."        # or SHEETS_API_KEY
//! # access_token = "..."   # or SHEETS_ACCESS_TOKEN (needed for appends)
//!
//! [db]
//! path = "./data/catalog.sqlite"
//!
//! [relevance]
//! related_stories_limit = 4
//! related_journeys_limit = 3
//!
//! [logging]
//! level = "info"
//! ```
//!
//! `SHEETS_API_KEY`, `SHEETS_ACCESS_TOKEN` and `SLOWMO_BIND` override the
//! file values when set.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub sheets: SheetsConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub relevance: RelevanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://sheets.googleapis.com".to_string()
}
fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Default and maximum sizes of related-content lists.
#[derive(Debug, Deserialize, Clone)]
pub struct RelevanceConfig {
    #[serde(default = "default_related_stories_limit")]
    pub related_stories_limit: usize,
    #[serde(default = "default_related_journeys_limit")]
    pub related_journeys_limit: usize,
    #[serde(default = "default_story_related_limit")]
    pub story_related_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            related_stories_limit: default_related_stories_limit(),
            related_journeys_limit: default_related_journeys_limit(),
            story_related_limit: default_story_related_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_related_stories_limit() -> usize {
    4
}
fn default_related_journeys_limit() -> usize {
    3
}
fn default_story_related_limit() -> usize {
    3
}
fn default_max_limit() -> usize {
    24
}

impl RelevanceConfig {
    /// Clamp a caller-supplied limit into `[1, max_limit]`, falling back to
    /// `default` when absent.
    pub fn clamp(&self, requested: Option<i64>, default: usize) -> usize {
        match requested {
            Some(n) if n < 1 => 1,
            Some(n) => (n as usize).min(self.max_limit),
            None => default.min(self.max_limit),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.apply_env();
    config.validate()?;
    Ok(config)
}

impl Config {
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("SHEETS_API_KEY") {
            self.sheets.api_key = Some(key);
        }
        if let Ok(token) = std::env::var("SHEETS_ACCESS_TOKEN") {
            self.sheets.access_token = Some(token);
        }
        if let Ok(bind) = std::env::var("SLOWMO_BIND") {
            self.server.bind = bind;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sheets.spreadsheet_id.trim().is_empty() {
            anyhow::bail!("sheets.spreadsheet_id must not be empty");
        }
        if self.sheets.timeout_secs == 0 {
            anyhow::bail!("sheets.timeout_secs must be > 0");
        }

        let r = &self.relevance;
        if r.max_limit < 1 {
            anyhow::bail!("relevance.max_limit must be >= 1");
        }
        for (name, value) in [
            ("related_stories_limit", r.related_stories_limit),
            ("related_journeys_limit", r.related_journeys_limit),
            ("story_related_limit", r.story_related_limit),
        ] {
            if value == 0 || value > r.max_limit {
                anyhow::bail!(
                    "relevance.{} must be in [1, {}] (got {})",
                    name,
                    r.max_limit,
                    value
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[server]
bind = "127.0.0.1:0"

[sheets]
spreadsheet_id = "sheet-123"

[db]
path = "/tmp/catalog.sqlite"
"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let cfg: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(cfg.sheets.api_base, "https://sheets.googleapis.com");
        assert_eq!(cfg.sheets.timeout_secs, 15);
        assert_eq!(cfg.relevance.related_stories_limit, 4);
        assert_eq!(cfg.relevance.related_journeys_limit, 3);
        assert_eq!(cfg.logging.level, "info");
        cfg.validate().unwrap();
    }

    #[test]
    fn test_empty_spreadsheet_id_rejected() {
        let mut cfg: Config = toml::from_str(MINIMAL).unwrap();
        cfg.sheets.spreadsheet_id = "  ".to_string();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("spreadsheet_id"));
    }

    #[test]
    fn test_limit_above_max_rejected() {
        let mut cfg: Config = toml::from_str(MINIMAL).unwrap();
        cfg.relevance.max_limit = 2;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("related_stories_limit"));
    }

    #[test]
    fn test_clamp() {
        let r = RelevanceConfig::default();
        assert_eq!(r.clamp(None, 4), 4);
        assert_eq!(r.clamp(Some(0), 4), 1);
        assert_eq!(r.clamp(Some(-3), 4), 1);
        assert_eq!(r.clamp(Some(7), 4), 7);
        assert_eq!(r.clamp(Some(1000), 4), r.max_limit);
    }

    #[test]
    fn test_load_config_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("site.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.sheets.spreadsheet_id, "sheet-123");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/site.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
