use thiserror::Error;

/// Error types for timezone lookups and the surrounding configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// Latitude outside of [-90, 90]
    #[error("Invalid latitude: {0} (expected a value between -90 and 90)")]
    InvalidLatitude(f64),

    /// Longitude outside of [-180, 180]
    #[error("Invalid longitude: {0} (expected a value between -180 and 180)")]
    InvalidLongitude(f64),

    /// Error when the request never produced an HTTP response
    #[error("API request failed: {0}")]
    ApiTransport(String),

    /// Error when the API answers with a non-success HTTP status
    #[error("API returned HTTP status {0}")]
    ApiStatus(u16),

    /// Error when parsing API response
    #[error("Failed to parse API response: {0}")]
    ApiParse(String),

    /// Error when the provider reports a non-OK status in a well-formed body
    #[error("API returned status {0}")]
    ApiLogic(String),

    /// Error when environment variable is not set
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// Error when a configuration value cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error reported by a cache store
    #[error("Cache store error: {0}")]
    Cache(String),
}

impl AppError {
    /// Stable tag identifying the failure, suitable for branching by callers.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidLatitude(_) => "invalid_latitude",
            AppError::InvalidLongitude(_) => "invalid_longitude",
            AppError::ApiTransport(_) => "api_transport_error",
            AppError::ApiStatus(_) => "api_status_error",
            AppError::ApiParse(_) => "api_parse_error",
            AppError::ApiLogic(_) => "api_logic_error",
            AppError::EnvVarNotSet(_) => "env_var_not_set",
            AppError::InvalidConfig(_) => "invalid_config",
            AppError::Cache(_) => "cache_error",
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // the request URL carries the api key
        AppError::ApiTransport(err.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(AppError::InvalidLatitude(91.0).kind(), "invalid_latitude");
        assert_eq!(AppError::InvalidLongitude(181.0).kind(), "invalid_longitude");
        assert_eq!(AppError::ApiStatus(503).kind(), "api_status_error");
        assert_eq!(
            AppError::ApiLogic("ZERO_RESULTS".into()).kind(),
            "api_logic_error"
        );
    }

    #[test]
    fn messages_carry_details() {
        assert!(AppError::ApiStatus(503).to_string().contains("503"));
        assert!(
            AppError::ApiLogic("REQUEST_DENIED".into())
                .to_string()
                .contains("REQUEST_DENIED")
        );
        assert!(AppError::InvalidLatitude(95.5).to_string().contains("95.5"));
    }
}
