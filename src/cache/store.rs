//! Cache storage.
//!
//! `CacheStore` is the port to the key-value store the platform runs against
//! (Redis in production). `MemoryStore` is the in-process implementation with
//! TTL expiry and LRU eviction.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use super::config::CacheConfig;
use super::error::CacheError;
use super::keys::CacheKey;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";
const METRIC_CACHE_EVICT: &str = "dailyblog_cache_evict_total";

/// Key-value store with TTL expiry.
///
/// Each operation is atomic on its own; callers add no locking on top.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored payload, or `None` when absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError>;

    /// Stores `value` under `key`, replacing any previous entry.
    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`. Returns true if a live entry existed.
    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;
}

struct StoredEntry {
    value: Bytes,
    /// `None` when the TTL reaches past the clock's range.
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-memory cache store.
///
/// Expired entries behave as absent and are purged when touched. Capacity is
/// bounded by LRU eviction.
pub struct MemoryStore {
    entries: Mutex<LruCache<CacheKey, StoredEntry>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create a new store with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(config.memory_capacity_non_zero())),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate an unreachable backend: every operation fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of entries held, including ones that expired but were not touched yet.
    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        mutex_lock(&self.entries, SOURCE, "clear").clear();
    }

    fn ensure_available(&self, op: &'static str) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::unavailable(format!(
                "memory store marked unavailable during {op}"
            )));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        self.ensure_available("get")?;
        let now = Instant::now();
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");

        let lookup = entries
            .get(key)
            .map(|entry| (entry.is_live(now), entry.value.clone()));

        match lookup {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                entries.pop(key);
                debug!(key = %key, "Cache entry expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        self.ensure_available("set")?;
        let entry = StoredEntry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };

        let evicted = mutex_lock(&self.entries, SOURCE, "set").push(key.clone(), entry);
        if let Some((evicted_key, _)) = evicted
            && &evicted_key != key
        {
            counter!(METRIC_CACHE_EVICT).increment(1);
            debug!(evicted = %evicted_key, "Cache entry evicted for capacity");
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.ensure_available("delete")?;
        let now = Instant::now();
        let removed = mutex_lock(&self.entries, SOURCE, "delete").pop(key);
        Ok(removed.is_some_and(|entry| entry.is_live(now)))
    }
}
