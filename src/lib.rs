//! Client for a geolocation timezone lookup API with an expiring payload cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod timezone;

pub use cache::{CacheStore, MemoryCache};
pub use config::ClientConfig;
pub use error::AppError;
pub use timezone::{
    CACHE_NAMESPACE, TimezoneClient, TimezonePayload, TimezoneQuery, TimezoneResponse,
};
