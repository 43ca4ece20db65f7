//! Application configuration. Storage, release interval, collaborators, roster.

use crate::domain::DEFAULT_MIN_INTERVAL_DAYS;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Which CycleStore backs the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Sqlite,
    Json,
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Base directory for the database / state file. Read from NEWSLETTER_DATA_DIR.
    pub data_dir: Option<String>,

    /// `sqlite` (default) or `json`. Read from NEWSLETTER_STORE.
    #[serde(default)]
    pub store: Option<StoreKind>,

    /// Days between two newsletter releases (default 30). Read from NEWSLETTER_MIN_INTERVAL_DAYS.
    #[serde(default)]
    pub min_interval_days: Option<u32>,

    // ─────────────────────────────────────────────────────────────────────────
    // REST collaborators
    // ─────────────────────────────────────────────────────────────────────────
    /// Base URL of the newsletter console API. Read from NEWSLETTER_API_URL.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Bearer token for the API. Read from NEWSLETTER_API_TOKEN.
    #[serde(default)]
    pub api_token: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Local collaborators
    // ─────────────────────────────────────────────────────────────────────────
    /// Where the Markdown compiler writes newsletters. Read from NEWSLETTER_NEWSLETTER_DIR.
    #[serde(default)]
    pub newsletter_dir: Option<String>,

    /// group id -> member ids. Only from the config file (NEWSLETTER_CONFIG).
    #[serde(default)]
    pub roster: Option<HashMap<String, Vec<String>>>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var("NEWSLETTER_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        // Environment wins over the file.
        c = c.add_source(config::Environment::with_prefix("NEWSLETTER"));
        c.build()?.try_deserialize()
    }

    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or("./data"))
    }

    pub fn store_or_default(&self) -> StoreKind {
        self.store.unwrap_or_default()
    }

    /// Defaults to 30 days.
    pub fn min_interval_days_or_default(&self) -> u32 {
        self.min_interval_days.unwrap_or(DEFAULT_MIN_INTERVAL_DAYS)
    }

    /// Defaults to `<data_dir>/newsletters`.
    pub fn newsletter_dir_or_default(&self) -> PathBuf {
        self.newsletter_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.data_dir_or_default().join("newsletters"))
    }

    /// API base URL, if the REST collaborators are configured.
    pub fn api_url(&self) -> Option<String> {
        self.api_url
            .clone()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
    }

    pub fn api_token(&self) -> Option<String> {
        self.api_token.clone()
    }

    /// Returns true if membership and compilation go through the REST API.
    pub fn is_api_configured(&self) -> bool {
        self.api_url().is_some()
    }

    pub fn roster_or_default(&self) -> HashMap<String, Vec<String>> {
        self.roster.clone().unwrap_or_default()
    }
}
