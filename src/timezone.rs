// Module containing the payload and the derived response view
mod response;

pub use response::{TimezonePayload, TimezoneResponse};

use std::sync::Arc;

use chrono::Utc;
use md5::{Digest, Md5};
use reqwest::header::{ACCEPT, HeaderValue};
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStore, MemoryCache};
use crate::config::ClientConfig;
use crate::error::AppError;

/// Prefix shared by every cache key this client writes
pub const CACHE_NAMESPACE: &str = "timezone_api_";

/// Status the provider sends with a successful lookup
const STATUS_OK: &str = "OK";

/// A single lookup: coordinates plus optional instant and language.
#[derive(Debug, Clone, PartialEq)]
pub struct TimezoneQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Seconds since the epoch, now when absent
    pub timestamp: Option<i64>,
    /// Language code for `timeZoneName`, e.g. "fr"
    pub language: Option<String>,
}

impl TimezoneQuery {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: None,
            language: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    fn validate(&self) -> Result<(), AppError> {
        // NaN fails both range checks
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::InvalidLatitude(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::InvalidLongitude(self.longitude));
        }
        Ok(())
    }

    fn language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|language| !language.is_empty())
    }
}

/// Client for the Time Zone API with an optional expiring cache in front of it.
pub struct TimezoneClient {
    config: ClientConfig,
    http: reqwest::Client,
    cache: Option<Arc<dyn CacheStore>>,
}

impl TimezoneClient {
    /// Creates a client backed by a fresh [`MemoryCache`] when caching is enabled.
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        Self::with_cache(config, cache)
    }

    /// Creates a client that keeps payloads in `cache`. The store is ignored
    /// when caching is disabled in `config`.
    pub fn with_cache(config: ClientConfig, cache: Arc<dyn CacheStore>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let cache = config.cache_enabled.then_some(cache);
        Ok(Self {
            config,
            http,
            cache,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Looks up the timezone at the given coordinates.
    ///
    /// # Arguments
    /// * `latitude` - Between -90 and 90
    /// * `longitude` - Between -180 and 180
    /// * `timestamp` - Instant to resolve DST for, now when `None`
    /// * `language` - Language of the returned zone name
    ///
    /// # Returns
    /// * `TimezoneResponse` built from the cached or freshly fetched payload
    /// * Error on invalid coordinates or any failed API call
    pub async fn get_timezone(
        &self,
        latitude: f64,
        longitude: f64,
        timestamp: Option<i64>,
        language: Option<&str>,
    ) -> Result<TimezoneResponse, AppError> {
        let query = TimezoneQuery {
            latitude,
            longitude,
            timestamp,
            language: language.map(String::from),
        };
        self.lookup(&query).await
    }

    pub async fn lookup(&self, query: &TimezoneQuery) -> Result<TimezoneResponse, AppError> {
        query.validate()?;

        info!(
            "Fetching timezone for location: {},{}",
            query.latitude, query.longitude
        );

        let params = self.params(query);
        let cache_key = self.cache.as_ref().map(|_| self.key_for_params(&params));

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(payload) = read_cached(cache.as_ref(), key) {
                debug!("Cache hit for {}", key);
                return Ok(TimezoneResponse::new(payload));
            }
            debug!("Cache miss for {}", key);
        }

        let payload = self.fetch(&params).await?;

        // whatever the provider returned with status OK is cached, valid or not
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            store_cached(cache.as_ref(), key, &payload, self.config.cache_expiration);
        }

        Ok(TimezoneResponse::new(payload))
    }

    /// Removes cached payloads.
    ///
    /// With an identifier only the entry derived from it is removed and the
    /// result says whether one existed. Without one, every entry under
    /// [`CACHE_NAMESPACE`] is removed and the result says whether the store
    /// completed the operation.
    ///
    /// A client with caching disabled holds no store: it returns `false` and
    /// leaves entries written by earlier caching clients in place.
    pub fn clear_cache(&self, identifier: Option<&str>) -> bool {
        let Some(cache) = &self.cache else {
            debug!("Caching is disabled, nothing to clear");
            return false;
        };

        match identifier {
            Some(identifier) => {
                let key = self.hashed_key(identifier);
                match cache.delete(&key) {
                    Ok(deleted) => {
                        debug!("Deleted cache entry {}: {}", key, deleted);
                        deleted
                    }
                    Err(e) => {
                        warn!("Failed to delete cache entry {}: {}", key, e);
                        false
                    }
                }
            }
            None => match cache.delete_by_prefix(CACHE_NAMESPACE) {
                Ok(count) => {
                    info!("Cleared {} cached timezone entries", count);
                    true
                }
                Err(e) => {
                    error!("Failed to clear timezone cache: {}", e);
                    false
                }
            },
        }
    }

    /// Cache key the given query is stored under, with the timestamp pinned
    /// to now when the query does not carry one.
    pub fn cache_key(&self, query: &TimezoneQuery) -> String {
        self.key_for_params(&self.params(query))
    }

    fn params(&self, query: &TimezoneQuery) -> Vec<(&'static str, String)> {
        let timestamp = query.timestamp.unwrap_or_else(|| Utc::now().timestamp());
        let mut params = vec![
            ("location", format!("{},{}", query.latitude, query.longitude)),
            ("timestamp", timestamp.to_string()),
            ("key", self.config.api_key.clone()),
        ];
        if let Some(language) = query.language() {
            params.push(("language", language.to_string()));
        }
        params
    }

    fn key_for_params(&self, params: &[(&'static str, String)]) -> String {
        // serializing a slice of pairs cannot fail
        let canonical = serde_json::to_string(params).unwrap_or_default();
        self.hashed_key(&canonical)
    }

    fn hashed_key(&self, identifier: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(identifier.as_bytes());
        hasher.update(self.config.api_key.as_bytes());
        format!("{}{}", CACHE_NAMESPACE, hex::encode(hasher.finalize()))
    }

    async fn fetch(&self, params: &[(&'static str, String)]) -> Result<TimezonePayload, AppError> {
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(params)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| {
                let err = AppError::from(e);
                error!("Timezone request failed: {}", err);
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Failed to fetch timezone data: {}", status);
            return Err(AppError::ApiStatus(status.as_u16()));
        }

        let body = response.text().await?;
        let payload: TimezonePayload = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse timezone response: {}", e);
            AppError::ApiParse(e.to_string())
        })?;

        if let Some(status) = payload.status.as_deref().filter(|s| *s != STATUS_OK) {
            error!(
                "Timezone API returned status {}: {}",
                status,
                payload.error_message.as_deref().unwrap_or("no details")
            );
            return Err(AppError::ApiLogic(status.to_string()));
        }

        debug!("Timezone data fetched successfully: {:?}", payload);
        Ok(payload)
    }
}

fn read_cached(cache: &dyn CacheStore, key: &str) -> Option<TimezonePayload> {
    let raw = match cache.get(key) {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return None,
        Err(e) => {
            warn!("Cache read failed for {}: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!("Ignoring undecodable cache entry {}: {}", key, e);
            None
        }
    }
}

fn store_cached(
    cache: &dyn CacheStore,
    key: &str,
    payload: &TimezonePayload,
    ttl: std::time::Duration,
) {
    let raw = match serde_json::to_string(payload) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to serialize payload for cache: {}", e);
            return;
        }
    };

    match cache.set(key, raw, ttl) {
        Ok(()) => debug!("Cached timezone payload under {}", key),
        Err(e) => warn!("Cache write failed for {}: {}", key, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_key: &str) -> TimezoneClient {
        TimezoneClient::new(ClientConfig::new(api_key)).unwrap()
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert_eq!(
            TimezoneQuery::new(90.5, 0.0).validate(),
            Err(AppError::InvalidLatitude(90.5))
        );
        assert_eq!(
            TimezoneQuery::new(0.0, -180.1).validate(),
            Err(AppError::InvalidLongitude(-180.1))
        );
        assert!(TimezoneQuery::new(f64::NAN, 0.0).validate().is_err());
        assert!(TimezoneQuery::new(-90.0, 180.0).validate().is_ok());
    }

    #[test]
    fn params_are_ordered() {
        let client = client("secret");
        let query = TimezoneQuery::new(37.4224764, -122.0842499)
            .with_timestamp(1_331_161_200)
            .with_language("fr");

        assert_eq!(
            client.params(&query),
            vec![
                ("location", "37.4224764,-122.0842499".to_string()),
                ("timestamp", "1331161200".to_string()),
                ("key", "secret".to_string()),
                ("language", "fr".to_string()),
            ]
        );
    }

    #[test]
    fn blank_language_is_omitted() {
        let client = client("secret");
        let query = TimezoneQuery::new(1.0, 2.0)
            .with_timestamp(0)
            .with_language("  ");
        assert_eq!(client.params(&query).len(), 3);
    }

    #[test]
    fn cache_key_depends_on_every_input() {
        let client = client("secret");
        let base = TimezoneQuery::new(51.5, -0.12).with_timestamp(1_700_000_000);
        let key = client.cache_key(&base);

        assert!(key.starts_with(CACHE_NAMESPACE));
        assert_eq!(key.len(), CACHE_NAMESPACE.len() + 32);
        assert_eq!(key, client.cache_key(&base.clone()));

        let later = base.clone().with_timestamp(1_700_000_001);
        let german = base.clone().with_language("de");
        let moved = TimezoneQuery::new(51.5, -0.13).with_timestamp(1_700_000_000);
        assert_ne!(key, client.cache_key(&later));
        assert_ne!(key, client.cache_key(&german));
        assert_ne!(key, client.cache_key(&moved));
        assert_ne!(key, self::client("other-secret").cache_key(&base));
    }

    #[test]
    fn clear_without_cache_is_noop() {
        let client =
            TimezoneClient::new(ClientConfig::new("secret").with_cache_enabled(false)).unwrap();
        assert!(!client.clear_cache(None));
        assert!(!client.clear_cache(Some("anything")));
    }
}
