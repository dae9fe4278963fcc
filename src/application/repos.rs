//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::posts::{PostId, PostRecord};
use crate::domain::users::{UserId, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Every post, newest first.
    async fn list_posts(&self) -> Result<Vec<PostRecord>, RepoError>;

    /// Posts of one author, newest first.
    async fn list_posts_by_author(&self, author_id: UserId) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError>;

    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    pub content_nature: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePostParams {
    pub title: Option<String>,
    pub content: Option<String>,
    pub content_nature: Option<String>,
}

/// Write side. Each call is one durable mutation.
#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(
        &self,
        id: PostId,
        params: UpdatePostParams,
    ) -> Result<PostRecord, RepoError>;

    /// Returns the deleted post.
    async fn delete_post(&self, id: PostId) -> Result<PostRecord, RepoError>;
}
