//! Post read and write services.
//!
//! Reads go through the read-through cache. Writes run inside a
//! [`Transaction`] whose post-commit hooks invalidate the cache and queue the
//! author's notification.

use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::authz::{can_modify_post, is_author};
use crate::application::mutations::MutationHooks;
use crate::application::pagination::{DEFAULT_PAGE_SIZE, Page, PaginationError, paginate};
use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::cache::{ReadThroughCache, ResourceIdentity};
use crate::domain::posts::{PostId, PostRecord};
use crate::domain::users::UserRecord;
use crate::tasks::Transaction;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("user `{0}` not found")]
    UserNotFound(String),
    #[error("post {0} not found")]
    PostNotFound(PostId),
    #[error("not allowed to {action} this post")]
    Forbidden { action: &'static str },
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct PostQueryService {
    repo: Arc<dyn PostsRepo>,
    cache: Arc<ReadThroughCache>,
    page_size: NonZeroUsize,
}

impl PostQueryService {
    pub fn new(repo: Arc<dyn PostsRepo>, cache: Arc<ReadThroughCache>) -> Self {
        Self {
            repo,
            cache,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Every post, newest first.
    pub async fn list_all(&self) -> Result<Vec<PostRecord>, PostError> {
        self.cache
            .get_or_compute(&ResourceIdentity::GlobalList, || async {
                self.repo.list_posts().await.map_err(PostError::from)
            })
            .await
    }

    /// Posts of `username`, newest first. An unknown user is an error and is
    /// not cached; a user without posts caches an empty list.
    pub async fn list_by_user(&self, username: &str) -> Result<Vec<PostRecord>, PostError> {
        self.cache
            .get_or_compute(&ResourceIdentity::user_list(username), || async {
                debug!(username, "Loading user posts from repository");
                let user = self
                    .repo
                    .find_user_by_username(username)
                    .await?
                    .ok_or_else(|| PostError::UserNotFound(username.to_string()))?;
                Ok::<_, PostError>(self.repo.list_posts_by_author(user.id).await?)
            })
            .await
    }

    pub async fn detail(&self, id: PostId) -> Result<PostRecord, PostError> {
        self.cache
            .get_or_compute(&ResourceIdentity::detail(id), || async {
                let post = self.repo.find_post(id).await?;
                post.ok_or(PostError::PostNotFound(id))
            })
            .await
    }

    pub async fn page_all(&self, number: usize) -> Result<Page<PostRecord>, PostError> {
        let posts = self.list_all().await?;
        Ok(paginate(&posts, number, self.page_size)?)
    }

    pub async fn page_by_user(
        &self,
        username: &str,
        number: usize,
    ) -> Result<Page<PostRecord>, PostError> {
        let posts = self.list_by_user(username).await?;
        Ok(paginate(&posts, number, self.page_size)?)
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub content_nature: String,
}

pub struct PostCommandService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    hooks: MutationHooks,
}

impl PostCommandService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        hooks: MutationHooks,
    ) -> Self {
        Self {
            reader,
            writer,
            hooks,
        }
    }

    pub async fn create(&self, actor: &UserRecord, input: NewPost) -> Result<PostRecord, PostError> {
        if !is_author(Some(actor)) {
            return Err(PostError::Forbidden { action: "create" });
        }

        let mut tx = Transaction::begin();
        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id: actor.id,
                title: input.title,
                content: input.content,
                content_nature: input.content_nature,
            })
            .await?;
        self.hooks.post_created(&mut tx, &post, actor);
        tx.commit().await;

        info!(post_id = post.id, author = %actor.username, "Post created");
        Ok(post)
    }

    pub async fn update(
        &self,
        actor: &UserRecord,
        id: PostId,
        changes: UpdatePostParams,
    ) -> Result<PostRecord, PostError> {
        self.authorize(actor, id, "update").await?;

        let mut tx = Transaction::begin();
        let post = self.writer.update_post(id, changes).await?;
        self.hooks.post_updated(&mut tx, &post, actor);
        tx.commit().await;

        info!(post_id = post.id, author = %actor.username, "Post updated");
        Ok(post)
    }

    pub async fn delete(&self, actor: &UserRecord, id: PostId) -> Result<PostRecord, PostError> {
        self.authorize(actor, id, "delete").await?;

        let mut tx = Transaction::begin();
        let post = self.writer.delete_post(id).await?;
        self.hooks.post_deleted(&mut tx, &post, actor);
        tx.commit().await;

        info!(
            post_id = post.id,
            title = %post.title,
            author = %actor.username,
            "Post deleted"
        );
        Ok(post)
    }

    /// Reads the post uncached: authorization must see committed ownership.
    async fn authorize(
        &self,
        actor: &UserRecord,
        id: PostId,
        action: &'static str,
    ) -> Result<PostRecord, PostError> {
        let post = self
            .reader
            .find_post(id)
            .await?
            .ok_or(PostError::PostNotFound(id))?;
        if !can_modify_post(Some(actor), &post) {
            return Err(PostError::Forbidden { action });
        }
        Ok(post)
    }
}
