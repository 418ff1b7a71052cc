use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::errors::Error;

use super::TokenCache;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local cache with lazy expiry: stale entries are dropped when read.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CacheEntry>>, Error> {
        self.entries
            .lock()
            .map_err(|_| Error::Cache("memory cache lock poisoned".into()))
    }

    /// Looks up a live entry, evicting it first if its TTL has passed.
    fn live_entry(
        entries: &mut HashMap<String, CacheEntry>,
        key: &str,
    ) -> Option<CacheEntry> {
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                trace!(key, "cache.evict");
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }
}

impl TokenCache for MemoryCache {
    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), Error> {
        // An unrepresentable deadline is treated as "never expires".
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.lock()?
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut entries = self.lock()?;
        Ok(Self::live_entry(&mut entries, key).map(|entry| entry.value))
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, Error> {
        let mut entries = self.lock()?;
        Ok(Self::live_entry(&mut entries, key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_without_ttl_persists() {
        let cache = MemoryCache::new();
        cache.set("k", "v".into(), None).unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));
        assert!(cache.exists("k").unwrap());
    }

    #[test]
    fn value_expires_after_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v".into(), Some(Duration::from_millis(30)))
            .unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));
        std::thread::sleep(Duration::from_millis(60));
        assert!(!cache.exists("k").unwrap());
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn zero_ttl_reads_as_absent() {
        let cache = MemoryCache::new();
        cache.set("k", "v".into(), Some(Duration::ZERO)).unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn remove_and_overwrite() {
        let cache = MemoryCache::new();
        cache.set("k", "one".into(), None).unwrap();
        cache.set("k", "two".into(), None).unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("two"));
        cache.remove("k").unwrap();
        assert!(!cache.exists("k").unwrap());
        cache.remove("missing").unwrap();
    }
}
