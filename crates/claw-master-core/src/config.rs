//! Configuration types.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;

const ENV_DATA_DIR: &str = "CLAW_MASTER_DATA_DIR";
const ENV_BIND: &str = "CLAW_MASTER_BIND";
const ENV_MOLTBOOK_URL: &str = "CLAW_MASTER_MOLTBOOK_URL";
const ENV_CLAWNEWS_URL: &str = "CLAW_MASTER_CLAWNEWS_URL";
const ENV_TIMEOUT_SECS: &str = "CLAW_MASTER_TIMEOUT_SECS";

const STORAGE_FILE: &str = "storage.json";

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct ClawMasterConfig {
    /// Directory holding the durable storage file.
    pub data_dir: PathBuf,
    /// Address the dashboard server listens on.
    pub bind_addr: SocketAddr,
    /// Moltbook API base URL.
    pub moltbook_base_url: String,
    /// ClawNews API base URL.
    pub clawnews_base_url: String,
    /// Timeout for each platform request.
    pub request_timeout: Duration,
}

impl Default for ClawMasterConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("claw-master"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            moltbook_base_url: "https://www.moltbook.com/api/v1".to_string(),
            clawnews_base_url: "https://clawnews.io/api".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClawMasterConfig {
    /// Build configuration from `CLAW_MASTER_*` environment variables,
    /// falling back to defaults for anything unset.
    ///
    /// # Errors
    /// Returns error if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns error if a variable is set to an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(bind) = lookup(ENV_BIND) {
            config.bind_addr = bind.parse().map_err(|e| invalid(ENV_BIND, e))?;
        }
        if let Some(url) = lookup(ENV_MOLTBOOK_URL) {
            config.moltbook_base_url = parse_base_url(ENV_MOLTBOOK_URL, &url)?;
        }
        if let Some(url) = lookup(ENV_CLAWNEWS_URL) {
            config.clawnews_base_url = parse_base_url(ENV_CLAWNEWS_URL, &url)?;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.parse().map_err(|e| invalid(ENV_TIMEOUT_SECS, e))?;
            if secs == 0 {
                return Err(invalid(ENV_TIMEOUT_SECS, "must be greater than zero"));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Path of the durable storage file.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(STORAGE_FILE)
    }
}

fn parse_base_url(key: &str, url: &str) -> Result<String, ConfigError> {
    let url = url.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(invalid(key, "expected an http(s) URL"));
    }
    Ok(url.to_string())
}

fn invalid(key: &str, message: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
