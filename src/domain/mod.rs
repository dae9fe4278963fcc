//! Domain model shared by the cache and task cores.

pub mod posts;
pub mod types;
pub mod users;
