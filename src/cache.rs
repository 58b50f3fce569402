use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::AppError;

/// Key-value store the client keeps raw payloads in.
///
/// Implementations are supplied by the hosting environment; the client only
/// relies on these four operations and does no locking of its own.
pub trait CacheStore: Send + Sync {
    /// Returns the stored value, or `None` if it is absent or expired.
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Stores `value` under `key`, replacing any previous entry.
    /// A zero `ttl` keeps the entry until it is deleted.
    fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), AppError>;

    /// Removes one entry. Returns whether something was removed.
    fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Removes every entry whose key starts with `prefix`. Returns how many were removed.
    fn delete_by_prefix(&self, prefix: &str) -> Result<usize, AppError>;
}

#[derive(Debug)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process [`CacheStore`] with per-entry expiration.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries that have not expired yet.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        purge(&mut self.entries.lock(), Instant::now())
    }
}

fn purge(entries: &mut HashMap<String, CacheEntry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    let purged = before - entries.len();
    if purged > 0 {
        debug!("Purged {} expired cache entries", purged);
    }
    purged
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), AppError> {
        let now = Instant::now();
        let expires_at = if ttl.is_zero() { None } else { Some(now + ttl) };

        // keys rarely repeat, so expired entries are swept on write
        let mut entries = self.entries.lock();
        purge(&mut entries, now);
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    fn delete_by_prefix(&self, prefix: &str) -> Result<usize, AppError> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn set_get_overwrite() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("a").unwrap(), None);

        cache.set("a", "one".into(), DAY).unwrap();
        assert_eq!(cache.get("a").unwrap().as_deref(), Some("one"));

        cache.set("a", "two".into(), DAY).unwrap();
        assert_eq!(cache.get("a").unwrap().as_deref(), Some("two"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn entries_expire() {
        let cache = MemoryCache::new();
        cache.set("short", "v".into(), Duration::from_millis(5)).unwrap();
        cache.set("forever", "v".into(), Duration::ZERO).unwrap();

        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.get("short").unwrap(), None);
        assert_eq!(cache.get("forever").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn set_sweeps_expired_entries_under_other_keys() {
        let cache = MemoryCache::new();
        for i in 0..1000 {
            cache.set(&format!("old_{i}"), "v".into(), Duration::from_millis(1)).unwrap();
        }

        std::thread::sleep(Duration::from_millis(20));

        for i in 0..10 {
            cache.set(&format!("new_{i}"), "v".into(), Duration::from_secs(60)).unwrap();
        }

        assert_eq!(cache.len(), 10);
        assert_eq!(cache.entries.lock().len(), 10);
    }

    #[test]
    fn purge_drops_only_expired() {
        let cache = MemoryCache::new();
        cache.set("a", "v".into(), Duration::from_millis(1)).unwrap();
        cache.set("b", "v".into(), Duration::from_millis(1)).unwrap();
        cache.set("c", "v".into(), DAY).unwrap();

        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn delete_single_entry() {
        let cache = MemoryCache::new();
        cache.set("a", "v".into(), DAY).unwrap();

        assert!(cache.delete("a").unwrap());
        assert!(!cache.delete("a").unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn delete_by_prefix_keeps_other_namespaces() {
        let cache = MemoryCache::new();
        cache.set("tz_1", "v".into(), DAY).unwrap();
        cache.set("tz_2", "v".into(), DAY).unwrap();
        cache.set("other_1", "v".into(), DAY).unwrap();

        assert_eq!(cache.delete_by_prefix("tz_").unwrap(), 2);
        assert_eq!(cache.delete_by_prefix("tz_").unwrap(), 0);
        assert_eq!(cache.get("other_1").unwrap().as_deref(), Some("v"));
    }
}
