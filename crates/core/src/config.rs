//! Connection settings for the hosted task collection
//!
//! Settings come from compiled defaults, optionally a JSON file, and finally
//! `TASKSYNC_*` environment variables, later sources winning.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::Error;
use crate::Result;

pub const DEFAULT_TABLE: &str = "tasks";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "TASKSYNC_API_URL";
pub const ENV_API_KEY: &str = "TASKSYNC_API_KEY";
pub const ENV_TABLE: &str = "TASKSYNC_TABLE";
pub const ENV_TIMEOUT_SECS: &str = "TASKSYNC_TIMEOUT_SECS";
pub const ENV_STAMP_UPDATED_AT: &str = "TASKSYNC_STAMP_UPDATED_AT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Base URL of the hosted backend, without a trailing path
    pub api_url: String,
    /// Public project key sent with every request
    pub api_key: String,
    /// Name of the remote task collection
    pub table: String,
    pub request_timeout_secs: u64,
    /// Send the client's clock as `updated_at` on updates. Leave off when the
    /// backend refreshes the column itself.
    pub stamp_updated_at: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            table: DEFAULT_TABLE.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            stamp_updated_at: false,
        }
    }
}

impl SyncConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Read a JSON settings file, then apply environment overrides
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;
        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Apply overrides from a variable lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(table) = lookup(ENV_TABLE) {
            self.table = table;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => warn!("Ignoring invalid {}={:?}", ENV_TIMEOUT_SECS, raw),
            }
        }
        if let Some(raw) = lookup(ENV_STAMP_UPDATED_AT) {
            match parse_flag(&raw) {
                Some(flag) => self.stamp_updated_at = flag,
                None => warn!("Ignoring invalid {}={:?}", ENV_STAMP_UPDATED_AT, raw),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.api_url.trim();
        if url.is_empty() {
            return Err(Error::Config("api_url is not set".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api_url must start with http:// or https://, got '{}'",
                url
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("api_key is not set".into()));
        }
        if self.table.trim().is_empty() {
            return Err(Error::Config("table must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request timeout must be at least one second".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `api_url` without trailing slashes
    pub fn base_url(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
