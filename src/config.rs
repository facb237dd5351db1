//! Runtime settings and configuration file loading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default requests-per-minute ceiling, shared across all workers.
pub const DEFAULT_REQUESTS_PER_MINUTE: usize = 300;
/// Default bound on concurrent fetch tasks.
pub const DEFAULT_CONCURRENCY: usize = 20;
/// Default per-URL retry ceiling.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Default base delay for exponential backoff, in milliseconds.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;
/// Consecutive 429 responses that abort the whole run.
pub const DEFAULT_MAX_CONSECUTIVE_429S: u32 = 3;
/// Default number of results committed per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Resolved application settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub request_timeout: u64,
    /// Rate-limit ceiling in requests per rolling minute.
    pub requests_per_minute: usize,
    /// Concurrent fetch task bound.
    pub concurrency: usize,
    /// Per-URL retry ceiling for transient failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Consecutive 429 responses before the run aborts.
    pub max_consecutive_429s: u32,
    /// Results committed per batch transaction.
    pub batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_consecutive_429s: DEFAULT_MAX_CONSECUTIVE_429S,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Configuration file structure (TOML). Every field is optional; set
/// fields overlay the defaults, and CLI flags overlay both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_minute: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_base_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_consecutive_429s: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
}

impl Config {
    /// Load configuration from the standard locations: `channelvet.toml`
    /// in the working directory, then the user config dir. Missing files
    /// mean defaults.
    pub fn load() -> Self {
        for path in Self::candidate_paths() {
            if path.is_file() {
                match Self::load_from_path(&path) {
                    Ok(config) => return config,
                    Err(err) => {
                        tracing::warn!("ignoring config file {}: {err}", path.display());
                    }
                }
            }
        }
        Self::default()
    }

    /// Load configuration from a specific file path.
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("channelvet.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("channelvet").join("config.toml"));
        }
        paths
    }

    /// Overlay set fields onto settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(rpm) = self.requests_per_minute {
            settings.requests_per_minute = rpm;
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(retries) = self.max_retries {
            settings.max_retries = retries;
        }
        if let Some(base) = self.retry_base_delay_ms {
            settings.retry_base_delay_ms = base;
        }
        if let Some(ceiling) = self.max_consecutive_429s {
            settings.max_consecutive_429s = ceiling;
        }
        if let Some(batch) = self.batch_size {
            settings.batch_size = batch;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_overlays_settings() {
        let config = Config {
            requests_per_minute: Some(60),
            concurrency: Some(4),
            ..Default::default()
        };

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings);

        assert_eq!(settings.requests_per_minute, 60);
        assert_eq!(settings.concurrency, 4);
        // Untouched fields keep their defaults.
        assert_eq!(settings.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(settings.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config =
            toml::from_str("requests_per_minute = 120\nbatch_size = 50\n").unwrap();
        assert_eq!(config.requests_per_minute, Some(120));
        assert_eq!(config.batch_size, Some(50));
        assert!(config.user_agent.is_none());
    }
}
