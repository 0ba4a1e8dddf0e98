//! Startup configuration read from the process environment.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub use quotes_alphavantage::{ALPHA_VANTAGE_BASE_URL as DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

/// Environment variable holding the provider API key.
pub const API_KEY_VAR: &str = "ALPHAVANTAGE_API_KEY";

/// Environment variable overriding the provider endpoint.
pub const BASE_URL_VAR: &str = "ALPHAVANTAGE_BASE_URL";

/// Environment variable overriding the request timeout, in seconds.
pub const TIMEOUT_VAR: &str = "ALPHAVANTAGE_TIMEOUT_SECS";

/// Configuration errors. Raised once at startup, never per request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The API key is absent or blank.
    #[error("ALPHAVANTAGE_API_KEY must be set to a non-empty value")]
    MissingApiKey,

    /// A variable is set but cannot be used.
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Provider settings, read once and shared by the service.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Provider API key.
    pub api_key: String,
    /// Provider query endpoint.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Creates a configuration with defaults for everything but the key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads the configuration from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; real environment variables take precedence.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);

        if let Some(url) = lookup(BASE_URL_VAR).map(|v| v.trim().to_string()) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    name: BASE_URL_VAR,
                    value: url,
                });
            }
            config.base_url = url;
        }

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    name: TIMEOUT_VAR,
                    value: raw.clone(),
                })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
