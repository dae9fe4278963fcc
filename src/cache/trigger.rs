//! Write-invalidation trigger.
//!
//! Deletes the cache keys of a mutated post. Must run after the mutation is
//! durably committed; running it earlier lets a concurrent reader repopulate
//! the cache with pre-mutation data.

use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use tracing::{debug, info, warn};

use super::config::CacheConfig;
use super::events::PostMutation;
use super::keys::{CacheKey, KeyPolicy};
use super::store::CacheStore;

const METRIC_CACHE_INVALIDATED: &str = "dailyblog_cache_invalidated_keys_total";
const METRIC_CACHE_STORE_ERROR: &str = "dailyblog_cache_store_error_total";

/// Outcome of one invalidation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    /// Keys that held a live entry and were removed.
    pub deleted: Vec<CacheKey>,
    /// Keys that were already absent.
    pub absent: Vec<CacheKey>,
    /// Keys whose delete failed; they stay stale until TTL expiry.
    pub failed: Vec<CacheKey>,
}

impl InvalidationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.deleted.len() + self.absent.len() + self.failed.len()
    }
}

/// Reacts to post mutations by deleting every affected key.
pub struct InvalidationTrigger {
    config: CacheConfig,
    policy: KeyPolicy,
    store: Arc<dyn CacheStore>,
}

impl InvalidationTrigger {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self {
            policy: KeyPolicy::new(config.key_prefix.clone()),
            config,
            store,
        }
    }

    pub fn policy(&self) -> &KeyPolicy {
        &self.policy
    }

    /// Invalidate the global list, the author's list and the post's detail
    /// entry.
    ///
    /// Never fails: store errors are logged and reported, and the affected
    /// entries are left to expire on their own.
    pub async fn on_post_mutated(&self, mutation: &PostMutation) -> InvalidationReport {
        let mut report = InvalidationReport::default();

        if !self.config.enabled {
            debug!(
                post_id = mutation.post_id,
                "Cache invalidation skipped: cache disabled"
            );
            return report;
        }

        let keys: Vec<CacheKey> = self
            .policy
            .invalidation_keys_for(mutation)
            .into_iter()
            .collect();

        let outcomes = join_all(keys.iter().map(|key| self.store.delete(key))).await;

        for (key, outcome) in keys.into_iter().zip(outcomes) {
            match outcome {
                Ok(true) => report.deleted.push(key),
                Ok(false) => report.absent.push(key),
                Err(err) => {
                    counter!(METRIC_CACHE_STORE_ERROR, "op" => "delete").increment(1);
                    warn!(
                        event_id = %mutation.event_id,
                        key = %key,
                        error = %err,
                        "Cache delete failed; entry stays until TTL expiry"
                    );
                    report.failed.push(key);
                }
            }
        }

        counter!(METRIC_CACHE_INVALIDATED).increment(report.deleted.len() as u64);

        info!(
            event_id = %mutation.event_id,
            post_id = mutation.post_id,
            author = %mutation.author,
            kind = %mutation.kind,
            deleted = report.deleted.len(),
            absent = report.absent.len(),
            failed = report.failed.len(),
            "Post cache invalidated"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::cache::keys::ResourceIdentity;
    use crate::cache::store::MemoryStore;

    async fn seed(store: &MemoryStore, key: &CacheKey) {
        store
            .set(key, Bytes::from_static(b"[]"), Duration::from_secs(60))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deletes_all_three_keys() {
        let store = Arc::new(MemoryStore::default());
        let trigger = InvalidationTrigger::new(CacheConfig::default(), store.clone());
        let policy = trigger.policy().clone();

        seed(&store, &policy.key_for(&ResourceIdentity::GlobalList)).await;
        seed(&store, &policy.key_for(&ResourceIdentity::user_list("ann"))).await;
        seed(&store, &policy.key_for(&ResourceIdentity::detail(3))).await;
        seed(&store, &policy.key_for(&ResourceIdentity::detail(4))).await;

        let report = trigger.on_post_mutated(&PostMutation::updated(3, "ann")).await;

        assert_eq!(report.deleted.len(), 3);
        assert!(report.is_clean());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_keys_are_not_errors() {
        let store = Arc::new(MemoryStore::default());
        let trigger = InvalidationTrigger::new(CacheConfig::default(), store);

        let report = trigger.on_post_mutated(&PostMutation::created(1, "ann")).await;

        assert_eq!(report.absent.len(), 3);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn store_failures_are_reported_not_raised() {
        let store = Arc::new(MemoryStore::default());
        store.set_unavailable(true);
        let trigger = InvalidationTrigger::new(CacheConfig::default(), store);

        let report = trigger.on_post_mutated(&PostMutation::deleted(1, "ann")).await;

        assert_eq!(report.failed.len(), 3);
        assert_eq!(report.attempted(), 3);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn disabled_cache_skips_invalidation() {
        let store = Arc::new(MemoryStore::default());
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let trigger = InvalidationTrigger::new(config, store);

        let report = trigger.on_post_mutated(&PostMutation::created(1, "ann")).await;
        assert_eq!(report.attempted(), 0);
    }
}
