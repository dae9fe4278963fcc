//! Post cache system.
//!
//! Read-through caching for the post list views and the post detail page,
//! with write invalidation driven by post mutation events.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via the `[cache]` section of `dailyblog.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! key_prefix = ""
//! memory_capacity = 1024
//!
//! [cache.ttl_seconds]
//! global_list = 3600
//! user_list = 1800
//! detail = 3600
//! summary = 3600
//! ```

mod config;
mod error;
mod events;
mod keys;
mod lock;
mod read_through;
mod store;
mod trigger;

pub use config::{CacheConfig, TtlPolicy};
pub use error::CacheError;
pub use events::PostMutation;
pub use keys::{CacheKey, KeyPolicy, ResourceIdentity, Scope};
pub use read_through::ReadThroughCache;
pub use store::{CacheStore, MemoryStore};
pub use trigger::{InvalidationReport, InvalidationTrigger};

pub(crate) use lock::mutex_lock;
