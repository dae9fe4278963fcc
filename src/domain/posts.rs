use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::users::UserId;

pub type PostId = u64;

/// Author reference carried by a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: UserId,
    pub username: String,
}

/// A blog post as cached by the list and detail views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub content_nature: String,
    pub author: AuthorRef,
    #[serde(with = "time::serde::rfc3339")]
    pub date_posted: OffsetDateTime,
}
