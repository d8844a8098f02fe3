//! In-memory response cache with per-entry time-to-live

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::trace;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::DEFAULT_CACHE_TTL;

struct CacheEntry<V> {
    data: V,
    expiry: Instant,
}

/// Key-value cache whose entries expire after a fixed duration.
///
/// Expired entries are evicted lazily, when they are read. Clones share the
/// same store.
pub struct TtlCache<V> {
    entries: Arc<Mutex<HashMap<String, CacheEntry<V>>>>,
    default_ttl: Duration,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            default_ttl: self.default_ttl,
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `data` under `key` until `ttl` has elapsed
    pub fn set(&self, key: &str, data: V, ttl: Duration) {
        let expiry = Instant::now() + ttl;
        self.lock()
            .insert(key.to_string(), CacheEntry { data, expiry });
    }

    /// Store `data` with the default time-to-live
    pub fn set_default(&self, key: &str, data: V) {
        self.set(key, data, self.default_ttl);
    }

    /// Fetch a fresh value, evicting it if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();
        let expired = Instant::now() > entries.get(key)?.expiry;
        if expired {
            trace!("Cache entry '{}' expired", key);
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.data.clone())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, expired ones included until they are read
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key for a request: the endpoint followed by its serialized options
pub fn cache_key<O: Serialize + ?Sized>(endpoint: &str, options: &O) -> String {
    let options = serde_json::to_string(options).unwrap_or_default();
    format!("{}_{}", endpoint, options)
}
