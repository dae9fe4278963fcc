//! Application services: post reads and writes, mutation side effects,
//! summaries, pagination and authorization.

pub mod authz;
pub mod error;
pub mod mutations;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod summaries;

pub use mutations::MutationHooks;
pub use posts::{NewPost, PostCommandService, PostError, PostQueryService};
pub use summaries::{Summarizer, SummaryService};
