//! Post mutation events.
//!
//! The persistence layer reports every committed create, update or delete of
//! a post with one of these.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::posts::PostId;
use crate::domain::types::MutationKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMutation {
    /// Correlates log lines of one mutation.
    pub event_id: Uuid,
    pub post_id: PostId,
    /// Username of the post's author.
    pub author: String,
    pub kind: MutationKind,
    pub occurred_at: OffsetDateTime,
}

impl PostMutation {
    pub fn new(post_id: PostId, author: impl Into<String>, kind: MutationKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            post_id,
            author: author.into(),
            kind,
            occurred_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn created(post_id: PostId, author: impl Into<String>) -> Self {
        Self::new(post_id, author, MutationKind::Created)
    }

    pub fn updated(post_id: PostId, author: impl Into<String>) -> Self {
        Self::new(post_id, author, MutationKind::Updated)
    }

    pub fn deleted(post_id: PostId, author: impl Into<String>) -> Self {
        Self::new(post_id, author, MutationKind::Deleted)
    }
}
