//! Read-through cache layer.
//!
//! Wraps a data fetch with get-or-compute-and-store semantics. A hit is
//! returned as stored; correctness relies on the invalidation trigger and TTL
//! expiry, never on re-validation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::{CacheKey, KeyPolicy, ResourceIdentity};
use super::store::CacheStore;

const METRIC_CACHE_HIT: &str = "dailyblog_cache_hit_total";
const METRIC_CACHE_MISS: &str = "dailyblog_cache_miss_total";
const METRIC_CACHE_STORE_ERROR: &str = "dailyblog_cache_store_error_total";

/// Read-through cache over a [`CacheStore`].
///
/// Concurrent misses on the same key may both compute and both write; the
/// last write wins. Values are serialized as JSON, so an empty collection is
/// stored and served like any other value.
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
    policy: KeyPolicy,
    config: CacheConfig,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            store,
            policy: KeyPolicy::new(config.key_prefix.clone()),
            config,
        }
    }

    pub fn policy(&self) -> &KeyPolicy {
        &self.policy
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the value for `identity`, computing and storing it on a miss with
    /// the TTL configured for the identity's scope.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        identity: &ResourceIdentity,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ttl = self.config.ttl.ttl_for(identity.scope());
        self.get_or_compute_with_ttl(identity, ttl, compute).await
    }

    /// Same as [`get_or_compute`](Self::get_or_compute) with an explicit TTL.
    ///
    /// Errors from `compute` are returned to the caller and nothing is stored.
    /// Store failures are logged and treated as misses.
    pub async fn get_or_compute_with_ttl<T, E, F, Fut>(
        &self,
        identity: &ResourceIdentity,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.enabled {
            return compute().await;
        }

        let key = self.policy.key_for(identity);
        let scope = identity.scope().as_str();

        if let Some(value) = self.lookup::<T>(&key).await {
            counter!(METRIC_CACHE_HIT, "scope" => scope).increment(1);
            debug!(key = %key, scope, "Cache hit");
            return Ok(value);
        }

        counter!(METRIC_CACHE_MISS, "scope" => scope).increment(1);
        debug!(key = %key, scope, "Cache miss; computing");

        let value = compute().await?;
        self.store_value(&key, &value, ttl).await;
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key = %key, error = %err, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                counter!(METRIC_CACHE_STORE_ERROR, "op" => "get").increment(1);
                warn!(key = %key, error = %err, "Cache get failed; treating as miss");
                None
            }
        }
    }

    async fn store_value<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let payload = match serde_json::to_vec(value) {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) => {
                warn!(key = %key, error = %err, "Cache payload serialization failed");
                return;
            }
        };

        if let Err(err) = self.store.set(key, payload, ttl).await {
            counter!(METRIC_CACHE_STORE_ERROR, "op" => "set").increment(1);
            warn!(key = %key, error = %err, "Cache set failed; value served uncached");
        }
    }
}
