use thiserror::Error;

/// Failure talking to the cache store.
///
/// Never surfaced to interactive callers: the read-through layer turns these
/// into misses and the invalidation trigger logs them.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache payload serialization failed: {0}")]
    Serialization(String),
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}
