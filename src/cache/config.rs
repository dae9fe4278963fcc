//! Cache configuration.
//!
//! Controls the read-through layer and the in-memory store via `dailyblog.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use super::keys::Scope;

// Default values for cache configuration
const DEFAULT_MEMORY_CAPACITY: usize = 1024;
const DEFAULT_GLOBAL_LIST_TTL_SECS: u64 = 60 * 60;
const DEFAULT_USER_LIST_TTL_SECS: u64 = 30 * 60;
const DEFAULT_DETAIL_TTL_SECS: u64 = 60 * 60;
const DEFAULT_SUMMARY_TTL_SECS: u64 = 60 * 60;

/// Time-to-live per cache scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub global_list: Duration,
    pub user_list: Duration,
    pub detail: Duration,
    pub summary: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            global_list: Duration::from_secs(DEFAULT_GLOBAL_LIST_TTL_SECS),
            user_list: Duration::from_secs(DEFAULT_USER_LIST_TTL_SECS),
            detail: Duration::from_secs(DEFAULT_DETAIL_TTL_SECS),
            summary: Duration::from_secs(DEFAULT_SUMMARY_TTL_SECS),
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for(&self, scope: Scope) -> Duration {
        match scope {
            Scope::GlobalList => self.global_list,
            Scope::UserList => self.user_list,
            Scope::Detail => self.detail,
            Scope::Summary => self.summary,
        }
    }

    /// Returns a copy with the TTL of `scope` replaced.
    pub fn with(mut self, scope: Scope, ttl: Duration) -> Self {
        match scope {
            Scope::GlobalList => self.global_list = ttl,
            Scope::UserList => self.user_list = ttl,
            Scope::Detail => self.detail = ttl,
            Scope::Summary => self.summary = ttl,
        }
        self
    }
}

/// Cache configuration resolved from settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Enable read-through caching and invalidation.
    pub enabled: bool,
    /// Namespace prepended to every key.
    pub key_prefix: String,
    /// Maximum entries held by the in-memory store.
    pub memory_capacity: usize,
    /// TTL per scope.
    pub ttl: TtlPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: String::new(),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            ttl: TtlPolicy::default(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            key_prefix: settings.key_prefix.clone(),
            memory_capacity: settings.memory_capacity.get(),
            ttl: settings.ttl,
        }
    }
}

impl CacheConfig {
    /// Returns the store capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
