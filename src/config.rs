use std::{env, time::Duration};

use crate::error::AppError;

/// Google Maps Time Zone API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/timezone/json";

/// One day, in seconds
pub const DEFAULT_CACHE_EXPIRATION: Duration = Duration::from_secs(86_400);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub const ENV_API_KEY: &str = "TIMEZONE_API_KEY";
pub const ENV_CACHE_ENABLED: &str = "TIMEZONE_CACHE_ENABLED";
pub const ENV_CACHE_EXPIRATION: &str = "TIMEZONE_CACHE_EXPIRATION";
pub const ENV_ENDPOINT: &str = "TIMEZONE_API_ENDPOINT";

/// Settings a [`crate::TimezoneClient`] is built from. They do not change
/// for the lifetime of the client.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub cache_enabled: bool,
    pub cache_expiration: Duration,
    pub endpoint: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            cache_enabled: true,
            cache_expiration: DEFAULT_CACHE_EXPIRATION,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_cache_expiration(mut self, expiration: Duration) -> Self {
        self.cache_expiration = expiration;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads the configuration from the process environment.
    ///
    /// `TIMEZONE_API_KEY` is required, the other variables fall back to defaults.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ENV_API_KEY)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::EnvVarNotSet(ENV_API_KEY.to_string()))?;

        let mut config = Self::new(api_key.trim());

        if let Some(value) = lookup(ENV_CACHE_ENABLED) {
            config.cache_enabled = parse_bool(&value).ok_or_else(|| {
                AppError::InvalidConfig(format!(
                    "{ENV_CACHE_ENABLED} must be a boolean, got `{value}`"
                ))
            })?;
        }

        if let Some(value) = lookup(ENV_CACHE_EXPIRATION) {
            let seconds: u64 = value.trim().parse().map_err(|_| {
                AppError::InvalidConfig(format!(
                    "{ENV_CACHE_EXPIRATION} must be a number of seconds, got `{value}`"
                ))
            })?;
            config.cache_expiration = Duration::from_secs(seconds);
        }

        if let Some(value) = lookup(ENV_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            config.endpoint = value.trim().to_string();
        }

        Ok(config)
    }
}

// hand-written so the api key stays out of logs
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_expiration", &self.cache_expiration)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
