//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STATE_FILE: &str = ".kilat-session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?} ({reason})")]
    Invalid { var: &'static str, value: String, reason: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl ClientTimeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API origin without a trailing slash.
    pub api_url: String,
    pub timeouts: ClientTimeouts,
    /// Where the CLI keeps the persisted session.
    pub state_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            timeouts: ClientTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `KILAT_API_URL`: default `http://localhost:8080`
    /// - `KILAT_REQUEST_TIMEOUT_SECS`: default 30
    /// - `KILAT_CONNECT_TIMEOUT_SECS`: default 10
    /// - `KILAT_STATE_FILE`: default `.kilat-session.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is not http(s) or a timeout is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("KILAT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
        let timeouts = ClientTimeouts {
            request_secs: env_parse_u64("KILAT_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("KILAT_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let state_file = std::env::var("KILAT_STATE_FILE").map_or_else(|_| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from);

        Self { api_url, timeouts, state_file }.validated()
    }

    /// Normalize and check a config assembled from any source.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is not http(s) or a timeout is zero.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.api_url = normalize_api_url(&self.api_url)?;
        if self.timeouts.request_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "KILAT_REQUEST_TIMEOUT_SECS",
                value: "0".into(),
                reason: "must be positive",
            });
        }
        if self.timeouts.connect_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "KILAT_CONNECT_TIMEOUT_SECS",
                value: "0".into(),
                reason: "must be positive",
            });
        }
        Ok(self)
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            var: "KILAT_API_URL",
            value: raw.to_owned(),
            reason: "expected an http:// or https:// URL",
        });
    }
    Ok(trimmed.to_owned())
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
