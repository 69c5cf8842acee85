//! Configuration for the review app.

use crate::models::Strategy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const APP_NAME: &str = "lingua-review";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub study: StudyConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Reads the config file, falling back to defaults when it is missing or malformed.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.config_dir().join("config.toml"))
    }

    /// Database location: the configured override, else the platform data dir,
    /// else the working directory.
    pub fn db_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.database_path {
            return path.clone();
        }
        directories::ProjectDirs::from("", "", APP_NAME)
            .map(|d| d.data_dir().join("reviews.sqlite3"))
            .unwrap_or_else(|| PathBuf::from("reviews.sqlite3"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Batch strategy used when a session starts: "due-only" or "all".
    #[serde(default)]
    pub default_strategy: Strategy,
    #[serde(default = "default_listen_timeout")]
    pub listen_timeout_secs: u64,
}

fn default_listen_timeout() -> u64 {
    10
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            default_strategy: Strategy::DueOnly,
            listen_timeout_secs: default_listen_timeout(),
        }
    }
}

impl StudyConfig {
    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Language of the answers (back text), used for spoken feedback.
    #[serde(default = "default_native_language")]
    pub native_language_tag: String,
}

fn default_true() -> bool {
    true
}

fn default_native_language() -> String {
    "en-US".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            native_language_tag: default_native_language(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter, overridden by `RUST_LOG`.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "lingua_review=info,lingua=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}
