//! Configuration management for the client.
//!
//! Loads configuration from environment variables with sensible defaults.
//! CLI flags override individual values afterwards.

use crate::error::ConfigError;
use std::env;
use std::time::Duration;
use url::Url;

/// Default backend base URL
pub const DEFAULT_API_URL: &str = "http://localhost:5000";
/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default post-login destination
pub const DEFAULT_DASHBOARD_PATH: &str = "/dashboard";
/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "taskboard=info,taskboard_runtime=warn";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL (`TASKBOARD_API_URL`)
    pub api_url: Url,
    /// Per-request timeout (`TASKBOARD_REQUEST_TIMEOUT_SECS`)
    pub request_timeout: Duration,
    /// Where a successful login navigates to (`TASKBOARD_DASHBOARD_PATH`)
    pub dashboard_path: String,
    /// Tracing filter directive (`RUST_LOG`)
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            dashboard_path: DEFAULT_DASHBOARD_PATH.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the URL or timeout is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            api_url: match lookup("TASKBOARD_API_URL") {
                Some(value) => parse_api_url(&value)?,
                None => defaults.api_url,
            },
            request_timeout: match lookup("TASKBOARD_REQUEST_TIMEOUT_SECS") {
                Some(value) => parse_timeout(&value)?,
                None => defaults.request_timeout,
            },
            dashboard_path: lookup("TASKBOARD_DASHBOARD_PATH").unwrap_or(defaults.dashboard_path),
            log_filter: lookup("RUST_LOG").unwrap_or(defaults.log_filter),
        };

        Ok(config)
    }

    /// Override the backend base URL
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `value` is not a usable base URL.
    pub fn with_api_url(mut self, value: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url(value)?;
        Ok(self)
    }

    /// Override the request timeout
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] for zero.
    pub fn with_timeout_secs(mut self, secs: u64) -> Result<Self, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::InvalidTimeout(secs.to_string()));
        }
        self.request_timeout = Duration::from_secs(secs);
        Ok(self)
    }
}

#[allow(clippy::expect_used)]
fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default API URL is valid")
}

fn parse_api_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim()).map_err(|e| ConfigError::InvalidUrl {
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl {
            value: value.to_string(),
            reason: "cannot be used as a base URL".to_string(),
        });
    }

    Ok(url)
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(value.to_string())),
    }
}
