//! Configuration loading from occupancy.toml.

use runtime::{Cadence, DEFAULT_INTERVAL_SECS, DEFAULT_TAIL};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_URL: &str = "http://localhost:5000/api/donnees";
const DEFAULT_DB: &str = "dashboard_data.db";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const ENV_SOURCE_URL: &str = "OCCUPANCY_SOURCE_URL";
pub const ENV_DB: &str = "OCCUPANCY_DB";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Remote provider settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Event store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Refresh cadence and display window.
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Remote provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    /// Endpoint returning a JSON array of events.
    #[serde(default = "default_url")]
    pub url: String,

    /// Request timeout in seconds; 0 disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Event store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file.
    #[serde(default = "default_db")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_db() }
    }
}

/// Display configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DisplayConfig {
    /// Seconds between updates (1 to 10).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Number of recent events shown.
    #[serde(default = "default_tail")]
    pub tail: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            tail: default_tail(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_db() -> PathBuf {
    PathBuf::from(DEFAULT_DB)
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_tail() -> usize {
    DEFAULT_TAIL
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` (normally `std::env::var`).
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_SOURCE_URL).filter(|v| !v.is_empty()) {
            self.source.url = url;
        }
        if let Some(path) = lookup(ENV_DB).filter(|v| !v.is_empty()) {
            self.store.path = PathBuf::from(path);
        }
        self
    }

    /// Check values the types alone cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Cadence::new(self.display.interval_secs)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.source.url.trim().is_empty() {
            return Err(ConfigError::Invalid("source.url is empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.source.url, DEFAULT_URL);
        assert_eq!(config.store.path, PathBuf::from(DEFAULT_DB));
        assert_eq!(config.display.interval_secs, 1);
        assert_eq!(config.display.tail, 20);
        assert_eq!(config.source.timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn parse_full_file() {
        let toml = r#"
[source]
url = "http://sensors.local/api/events"
timeout_secs = 0

[store]
path = "/var/lib/occupancy/events.db"

[display]
interval_secs = 5
tail = 50
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.source.url, "http://sensors.local/api/events");
        assert_eq!(config.source.timeout(), None);
        assert_eq!(config.store.path, PathBuf::from("/var/lib/occupancy/events.db"));
        assert_eq!(config.display.interval_secs, 5);
        assert_eq!(config.display.tail, 50);
    }

    #[test]
    fn interval_out_of_range_is_invalid() {
        let err = Config::parse("[display]\ninterval_secs = 30\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::parse("[display\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let config = Config::default().with_env(|key| match key {
            ENV_SOURCE_URL => Some("http://other/api".into()),
            ENV_DB => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.source.url, "http://other/api");
        assert_eq!(config.store.path, PathBuf::from(DEFAULT_DB));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("occupancy.toml")).unwrap();
        assert_eq!(config, Config::default());

        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[display]\ntail = 5\n").unwrap();
        assert_eq!(Config::load_or_default(&path).unwrap().display.tail, 5);
    }
}
