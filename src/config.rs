//! Client configuration.
//!
//! All external endpoints, credentials, and timing constants live here so the
//! rest of the crate takes configuration as passed-in context. Loadable from
//! TOML or built in code.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::poll::PollConfig;

/// Default Airtable-compatible API root.
const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration for the PathForge client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub planner: PlannerConfig,
    pub airtable: AirtableConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }
}

/// Where generation requests are triggered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Webhook URL of the workflow automation
    pub webhook_url: String,
}

/// Where roadmap and user records live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtableConfig {
    /// API root, overridable so tests can point at a local server
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base identifier
    pub base_id: String,

    /// Table holding task rows
    #[serde(default = "default_progress_table")]
    pub progress_table: String,

    /// Table holding user profiles
    #[serde(default = "default_users_table")]
    pub users_table: String,

    /// Bearer token for the API
    pub api_key: String,
}

impl AirtableConfig {
    /// URL of a table.
    pub fn table_url(&self, table: &str) -> String {
        format!(
            "{}/{}/{}",
            self.api_url.trim_end_matches('/'),
            self.base_id,
            table
        )
    }

    /// URL of a single record.
    pub fn record_url(&self, table: &str, record_id: &str) -> String {
        format!("{}/{}", self.table_url(table), record_id)
    }
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            base_id: String::new(),
            progress_table: default_progress_table(),
            users_table: default_users_table(),
            api_key: String::new(),
        }
    }
}

/// Where session state persists between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path of the session file
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_progress_table() -> String {
    "Progress".to_string()
}

fn default_users_table() -> String {
    "Users".to_string()
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".pathforge/session.json")
}
