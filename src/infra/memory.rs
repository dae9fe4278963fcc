//! In-process persistence adapter for posts and accounts.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::cache::mutex_lock;
use crate::domain::posts::{AuthorRef, PostId, PostRecord};
use crate::domain::users::{UserId, UserRecord};
use crate::tasks::{DirectoryError, InactiveAccounts, SweepError, UserDirectory};

const SOURCE: &str = "infra::memory";

#[derive(Debug, Default)]
struct BlogState {
    users: BTreeMap<UserId, UserRecord>,
    posts: BTreeMap<PostId, PostRecord>,
    next_post_id: PostId,
}

/// Posts and accounts held in memory.
#[derive(Debug, Default)]
pub struct InMemoryBlog {
    state: Mutex<BlogState>,
    fail_writes: AtomicBool,
}

impl InMemoryBlog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: UserRecord) {
        mutex_lock(&self.state, SOURCE, "add_user").users.insert(user.id, user);
    }

    /// Make every following write fail, simulating a failed commit.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("write rejected"));
        }
        Ok(())
    }
}

fn newest_first(mut posts: Vec<PostRecord>) -> Vec<PostRecord> {
    posts.sort_by(|a, b| {
        b.date_posted
            .cmp(&a.date_posted)
            .then_with(|| b.id.cmp(&a.id))
    });
    posts
}

#[async_trait]
impl PostsRepo for InMemoryBlog {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, RepoError> {
        let state = mutex_lock(&self.state, SOURCE, "list_posts");
        Ok(newest_first(state.posts.values().cloned().collect()))
    }

    async fn list_posts_by_author(&self, author_id: UserId) -> Result<Vec<PostRecord>, RepoError> {
        let state = mutex_lock(&self.state, SOURCE, "list_posts_by_author");
        Ok(newest_first(
            state
                .posts
                .values()
                .filter(|post| post.author.id == author_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        Ok(mutex_lock(&self.state, SOURCE, "find_post")
            .posts
            .get(&id)
            .cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        Ok(mutex_lock(&self.state, SOURCE, "find_user")
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryBlog {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        self.check_writable()?;
        if params.title.trim().is_empty() {
            return Err(RepoError::invalid_input("title must not be empty"));
        }

        let mut state = mutex_lock(&self.state, SOURCE, "create_post");
        let author = state
            .users
            .get(&params.author_id)
            .map(|user| AuthorRef {
                id: user.id,
                username: user.username.clone(),
            })
            .ok_or(RepoError::NotFound)?;

        state.next_post_id += 1;
        let post = PostRecord {
            id: state.next_post_id,
            title: params.title,
            content: params.content,
            content_nature: params.content_nature,
            author,
            date_posted: OffsetDateTime::now_utc(),
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(
        &self,
        id: PostId,
        params: UpdatePostParams,
    ) -> Result<PostRecord, RepoError> {
        self.check_writable()?;

        let mut state = mutex_lock(&self.state, SOURCE, "update_post");
        let post = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(title) = params.title {
            post.title = title;
        }
        if let Some(content) = params.content {
            post.content = content;
        }
        if let Some(nature) = params.content_nature {
            post.content_nature = nature;
        }
        Ok(post.clone())
    }

    async fn delete_post(&self, id: PostId) -> Result<PostRecord, RepoError> {
        self.check_writable()?;

        mutex_lock(&self.state, SOURCE, "delete_post")
            .posts
            .remove(&id)
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl InactiveAccounts for InMemoryBlog {
    async fn inactive_before(&self, cutoff: OffsetDateTime) -> Result<Vec<UserRecord>, SweepError> {
        Ok(mutex_lock(&self.state, SOURCE, "inactive_before")
            .users
            .values()
            .filter(|user| user.last_active_at < cutoff)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserDirectory for InMemoryBlog {
    async fn user_exists(&self, id: UserId) -> Result<bool, DirectoryError> {
        Ok(mutex_lock(&self.state, SOURCE, "user_exists")
            .users
            .contains_key(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Role;

    fn ann() -> UserRecord {
        UserRecord {
            id: 1,
            username: "ann".into(),
            email: "ann@example.com".into(),
            role: Role::Author,
            last_active_at: OffsetDateTime::now_utc(),
        }
    }

    fn params(title: &str) -> CreatePostParams {
        CreatePostParams {
            author_id: 1,
            title: title.into(),
            content: "body".into(),
            content_nature: "daily".into(),
        }
    }

    #[tokio::test]
    async fn create_list_delete() {
        let blog = InMemoryBlog::new();
        blog.add_user(ann());

        let first = blog.create_post(params("one")).await.unwrap();
        let second = blog.create_post(params("two")).await.unwrap();

        let listed = blog.list_posts().await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(blog.list_posts_by_author(1).await.unwrap().len(), 2);

        blog.delete_post(first.id).await.unwrap();
        assert!(blog.find_post(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_writes_change_nothing() {
        let blog = InMemoryBlog::new();
        blog.add_user(ann());
        blog.set_fail_writes(true);

        assert!(blog.create_post(params("one")).await.is_err());
        assert!(blog.list_posts().await.unwrap().is_empty());
    }
}
