//! Cached AI summaries of posts.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::error;

use crate::cache::{ReadThroughCache, ResourceIdentity};
use crate::domain::posts::PostRecord;

/// Opaque summarization backend. `None` means no summary could be produced.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Option<String>;
}

#[derive(Debug, Error)]
#[error("summary unavailable")]
struct SummaryUnavailable;

pub struct SummaryService {
    cache: Arc<ReadThroughCache>,
    summarizer: Arc<dyn Summarizer>,
}

impl SummaryService {
    pub fn new(cache: Arc<ReadThroughCache>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { cache, summarizer }
    }

    /// Summary of `post`, generated at most once per TTL window. Failed or
    /// empty summaries are not cached.
    pub async fn summary_for(&self, post: &PostRecord) -> Option<String> {
        let identity = ResourceIdentity::summary(post.id);
        let result = self
            .cache
            .get_or_compute(&identity, || async {
                self.summarizer
                    .summarize(&post.content)
                    .await
                    .filter(|summary| !summary.trim().is_empty())
                    .ok_or(SummaryUnavailable)
            })
            .await;

        match result {
            Ok(summary) => Some(summary),
            Err(err) => {
                error!(
                    post_id = post.id,
                    title = %post.title,
                    error = %err,
                    "Failed to generate summary"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use time::OffsetDateTime;

    use super::*;
    use crate::cache::{CacheConfig, MemoryStore};
    use crate::domain::posts::AuthorRef;

    struct Scripted {
        replies: Mutex<Vec<Option<String>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(replies: Vec<Option<&str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .rev()
                        .map(|reply| reply.map(String::from))
                        .collect(),
                ),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Summarizer for Scripted {
        async fn summarize(&self, _text: &str) -> Option<String> {
            *self.calls.lock().unwrap() += 1;
            self.replies.lock().unwrap().pop().flatten()
        }
    }

    fn post() -> PostRecord {
        PostRecord {
            id: 5,
            title: "Rust".into(),
            content: "long text".into(),
            content_nature: "tech".into(),
            author: AuthorRef {
                id: 1,
                username: "ann".into(),
            },
            date_posted: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn service(summarizer: Arc<Scripted>) -> SummaryService {
        let cache = ReadThroughCache::new(Arc::new(MemoryStore::default()), CacheConfig::default());
        SummaryService::new(Arc::new(cache), summarizer)
    }

    #[tokio::test]
    async fn summary_is_generated_once() {
        let summarizer = Arc::new(Scripted::new(vec![Some("short"), Some("other")]));
        let service = service(summarizer.clone());

        assert_eq!(service.summary_for(&post()).await.as_deref(), Some("short"));
        assert_eq!(service.summary_for(&post()).await.as_deref(), Some("short"));
        assert_eq!(summarizer.calls(), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let summarizer = Arc::new(Scripted::new(vec![None, Some(""), Some("third time")]));
        let service = service(summarizer.clone());

        assert_eq!(service.summary_for(&post()).await, None);
        assert_eq!(service.summary_for(&post()).await, None);
        assert_eq!(
            service.summary_for(&post()).await.as_deref(),
            Some("third time")
        );
        assert_eq!(summarizer.calls(), 3);
    }
}
