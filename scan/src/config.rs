//! Configuration for elnok.
//!
//! Config file resolution order:
//! 1. Explicit path passed to Config::load_from()
//! 2. ELNOK_CONFIG environment variable
//! 3. Default: <XDG config dir>/elnok/config.toml
//!
//! A missing file is not an error: the built-in defaults are used.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable pointing at an alternative config file.
pub const ELNOK_CONFIG_VAR: &str = "ELNOK_CONFIG";

/// Largest page the backend accepts in a single search request.
pub const MAX_PAGE_SIZE: usize = 10_000;

/// elnok configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Address and port of the search server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Index pattern to look into. Can be comma separated.
    #[serde(default = "default_index")]
    pub index: String,

    /// Number of hits requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Lifetime of the point-in-time, renewed on every page fetch.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Field holding the log time, used for sorting and time ranges.
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
}

fn default_host() -> String {
    "localhost:9200".to_string()
}

fn default_index() -> String {
    "logstash-*".to_string()
}

fn default_page_size() -> usize {
    // Too small causes a lot of overhead, too big causes latency
    1_000
}

fn default_keep_alive_secs() -> u64 {
    10
}

fn default_timestamp_field() -> String {
    "@timestamp".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            index: default_index(),
            page_size: default_page_size(),
            keep_alive_secs: default_keep_alive_secs(),
            timestamp_field: default_timestamp_field(),
        }
    }
}

impl Config {
    /// Load config using the default resolution order.
    pub fn load() -> Result<Self> {
        match resolve_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from a specific file, or the defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check the values a scan depends on.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.index.trim().is_empty() {
            return Err(Error::Config("index pattern must not be empty".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "page_size must be between 1 and {} (got {})",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        if self.keep_alive_secs == 0 {
            return Err(Error::Config("keep_alive_secs must be positive".to_string()));
        }
        if self.timestamp_field.is_empty() {
            return Err(Error::Config("timestamp_field must not be empty".to_string()));
        }
        Ok(())
    }

    /// Lease duration in the backend's time unit syntax (e.g. "10s").
    pub fn keep_alive(&self) -> String {
        format!("{}s", self.keep_alive_secs)
    }

    /// Base URL of the search server.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        }
    }
}

/// Resolve the config file path using the standard resolution order.
fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ELNOK_CONFIG_VAR) {
        return Some(PathBuf::from(path));
    }

    ProjectDirs::from("", "", "elnok").map(|dirs| dirs.config_dir().join("config.toml"))
}
