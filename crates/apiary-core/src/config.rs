//! Console configuration
//!
//! Loaded from a TOML file or assembled with the builder methods;
//! every field has a default suitable for a local backend.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for one console instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the REST surface, including the API prefix
    pub api_base: String,
    /// URL of the node push channel
    pub ws_url: String,
    /// Fixed delay between reconnect attempts, in seconds
    pub reconnect_delay_secs: u64,
    /// Default page size for listings
    pub page_limit: u64,
    /// Maximum entries held by the per-view cache
    pub cache_capacity: u64,
    /// Per-view cache entry lifetime, in seconds
    pub cache_ttl_secs: u64,
    /// Path of the persisted session state file
    pub state_file: PathBuf,
}

impl ConsoleConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a REST base URL
    #[inline]
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// With a push-channel URL
    #[inline]
    #[must_use]
    pub fn with_ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = ws_url.into();
        self
    }

    /// With a reconnect delay
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, secs: u64) -> Self {
        self.reconnect_delay_secs = secs;
        self
    }

    /// With a session state file location
    #[inline]
    #[must_use]
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = path.into();
        self
    }

    /// Reconnect delay as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Cache TTL as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` if the contents are not valid
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8001/api/v1".to_string(),
            ws_url: "ws://localhost:8001/api/v1/nodes/ws".to_string(),
            reconnect_delay_secs: 5,
            page_limit: 50,
            cache_capacity: 256,
            cache_ttl_secs: 60,
            state_file: PathBuf::from("apiary-session.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builder_overrides_defaults() {
        let config = ConsoleConfig::new()
            .with_api_base("https://fleet.example.com/api/v1")
            .with_reconnect_delay(2);
        assert_eq!(config.api_base, "https://fleet.example.com/api/v1");
        assert_eq!(config.reconnect_delay(), Duration::from_secs(2));
        // Untouched fields keep their defaults
        assert_eq!(config.page_limit, 50);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_base = \"http://10.0.0.2:8001/api/v1\"\nreconnect_delay_secs = 3"
        )
        .unwrap();

        let config = ConsoleConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.api_base, "http://10.0.0.2:8001/api/v1");
        assert_eq!(config.reconnect_delay_secs, 3);
        assert_eq!(config.cache_capacity, 256);
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = ConsoleConfig::from_toml_file("/nonexistent/apiary.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_base = [not toml").unwrap();
        let err = ConsoleConfig::from_toml_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
