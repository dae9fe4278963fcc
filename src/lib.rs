//! dailyblog
//!
//! Caching and background-task core for the MyDailyBlog platform.
//!
//! - **cache**: key policy, cache store port, read-through layer and the
//!   write-invalidation trigger for post listings and post detail pages.
//! - **tasks**: retryable task wrapper, in-memory task queue, commit-deferred
//!   scheduling and the batch reminder sweep.
//! - **application**: mutation hooks, post queries, summaries, pagination and
//!   authorization predicates built on top of the two cores.
//! - **domain**: users, roles and posts as seen by the cores.
//! - **config** / **infra**: layered settings and telemetry bootstrap.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod tasks;
