//! Read-through caching and write invalidation across the post services.

use std::collections::HashSet;
use std::sync::Arc;

use dailyblog::application::repos::{CreatePostParams, PostsWriteRepo, UpdatePostParams};
use dailyblog::application::{
    MutationHooks, NewPost, PostCommandService, PostError, PostQueryService,
};
use dailyblog::cache::{
    CacheConfig, CacheStore, InvalidationTrigger, KeyPolicy, MemoryStore, PostMutation,
    ReadThroughCache, ResourceIdentity,
};
use dailyblog::domain::types::{MutationKind, Role};
use dailyblog::domain::users::UserRecord;
use dailyblog::infra::memory::InMemoryBlog;
use dailyblog::tasks::{MemoryTaskQueue, TaskQueue, TaskRegistry};
use time::OffsetDateTime;

struct Harness {
    blog: Arc<InMemoryBlog>,
    store: Arc<MemoryStore>,
    queries: PostQueryService,
    commands: PostCommandService,
}

fn user(id: u64, name: &str, role: Role) -> UserRecord {
    UserRecord {
        id,
        username: name.to_string(),
        email: format!("{name}@example.com"),
        role,
        last_active_at: OffsetDateTime::now_utc(),
    }
}

fn harness() -> Harness {
    let config = CacheConfig::default();
    let blog = Arc::new(InMemoryBlog::new());
    blog.add_user(user(1, "ann", Role::Author));
    blog.add_user(user(2, "bob", Role::Author));

    let store = Arc::new(MemoryStore::new(&config));
    let cache = Arc::new(ReadThroughCache::new(store.clone(), config.clone()));
    let trigger = Arc::new(InvalidationTrigger::new(config, store.clone()));
    let queue: Arc<dyn TaskQueue> = Arc::new(MemoryTaskQueue::new(TaskRegistry::default()));

    Harness {
        queries: PostQueryService::new(blog.clone(), cache),
        commands: PostCommandService::new(
            blog.clone(),
            blog.clone(),
            MutationHooks::new(trigger, queue),
        ),
        blog,
        store,
    }
}

fn new_post(title: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: "body".to_string(),
        content_nature: "daily".to_string(),
    }
}

#[test]
fn invalidation_keys_are_exactly_the_three_affected_views() {
    let policy = KeyPolicy::default();

    for kind in [MutationKind::Created, MutationKind::Updated, MutationKind::Deleted] {
        let mutation = PostMutation::new(42, "ann", kind);
        let keys: HashSet<String> = policy
            .invalidation_keys_for(&mutation)
            .iter()
            .map(|key| key.to_string())
            .collect();

        let expected: HashSet<String> = ["post_list_view", "user_posts_ann", "post_detail_42"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(keys, expected);
    }
}

#[test]
fn keys_are_distinct_across_scopes() {
    let policy = KeyPolicy::new("blog:");
    let identities = [
        ResourceIdentity::GlobalList,
        ResourceIdentity::user_list("1"),
        ResourceIdentity::user_list("ann"),
        ResourceIdentity::user_list("post_detail_1"),
        ResourceIdentity::detail(1),
        ResourceIdentity::detail(11),
        ResourceIdentity::summary(1),
    ];

    let keys: HashSet<String> = identities
        .iter()
        .map(|identity| policy.key_for(identity).to_string())
        .collect();
    assert_eq!(keys.len(), identities.len());
    assert!(keys.iter().all(|key| key.starts_with("blog:")));
}

#[tokio::test]
async fn reads_are_served_from_cache_until_invalidated() {
    let h = harness();
    let ann = user(1, "ann", Role::Author);

    h.commands.create(&ann, new_post("first")).await.unwrap();
    assert_eq!(h.queries.list_all().await.unwrap().len(), 1);

    // A write that bypasses the mutation hooks stays invisible.
    h.blog
        .create_post(CreatePostParams {
            author_id: 1,
            title: "sneaky".into(),
            content: "body".into(),
            content_nature: "daily".into(),
        })
        .await
        .unwrap();
    assert_eq!(h.queries.list_all().await.unwrap().len(), 1);

    h.commands.create(&ann, new_post("second")).await.unwrap();
    let titles: Vec<String> = h
        .queries
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|post| post.title)
        .collect();
    assert_eq!(titles, vec!["second", "sneaky", "first"]);
}

#[tokio::test]
async fn update_refreshes_detail_and_author_list() {
    let h = harness();
    let ann = user(1, "ann", Role::Author);
    let post = h.commands.create(&ann, new_post("draft")).await.unwrap();

    assert_eq!(h.queries.detail(post.id).await.unwrap().title, "draft");
    assert_eq!(h.queries.list_by_user("ann").await.unwrap()[0].title, "draft");

    h.commands
        .update(
            &ann,
            post.id,
            UpdatePostParams {
                title: Some("final".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(h.queries.detail(post.id).await.unwrap().title, "final");
    assert_eq!(h.queries.list_by_user("ann").await.unwrap()[0].title, "final");
}

#[tokio::test]
async fn delete_removes_post_from_every_view() {
    let h = harness();
    let ann = user(1, "ann", Role::Author);
    let post = h.commands.create(&ann, new_post("short-lived")).await.unwrap();
    h.queries.detail(post.id).await.unwrap();
    h.queries.list_by_user("ann").await.unwrap();

    h.commands.delete(&ann, post.id).await.unwrap();

    assert!(matches!(
        h.queries.detail(post.id).await,
        Err(PostError::PostNotFound(_))
    ));
    assert!(h.queries.list_by_user("ann").await.unwrap().is_empty());
    assert!(h.queries.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn other_authors_cannot_modify() {
    let h = harness();
    let ann = user(1, "ann", Role::Author);
    let bob = user(2, "bob", Role::Author);
    let reader = user(3, "cat", Role::Reader);
    let post = h.commands.create(&ann, new_post("mine")).await.unwrap();

    assert!(matches!(
        h.commands.delete(&bob, post.id).await,
        Err(PostError::Forbidden { .. })
    ));
    assert!(matches!(
        h.commands.create(&reader, new_post("nope")).await,
        Err(PostError::Forbidden { .. })
    ));
}

#[tokio::test]
async fn unknown_user_is_not_cached_and_empty_lists_are() {
    let h = harness();

    assert!(matches!(
        h.queries.list_by_user("zed").await,
        Err(PostError::UserNotFound(_))
    ));
    assert!(h.store.is_empty());

    assert!(h.queries.list_by_user("bob").await.unwrap().is_empty());
    let key = KeyPolicy::default().key_for(&ResourceIdentity::user_list("bob"));
    assert!(h.store.get(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn unavailable_store_degrades_to_fresh_reads() {
    let h = harness();
    let ann = user(1, "ann", Role::Author);
    h.store.set_unavailable(true);

    let post = h.commands.create(&ann, new_post("offline")).await.unwrap();
    assert_eq!(h.queries.detail(post.id).await.unwrap().title, "offline");
    assert_eq!(h.queries.page_all(1).await.unwrap().items.len(), 1);
}

#[tokio::test]
async fn pages_hold_four_posts() {
    let h = harness();
    let ann = user(1, "ann", Role::Author);
    for n in 0..6 {
        h.commands
            .create(&ann, new_post(&format!("post {n}")))
            .await
            .unwrap();
    }

    let first = h.queries.page_by_user("ann", 1).await.unwrap();
    assert_eq!(first.items.len(), 4);
    assert_eq!(first.num_pages, 2);
    assert_eq!(h.queries.page_all(2).await.unwrap().items.len(), 2);
    assert!(matches!(
        h.queries.page_all(3).await,
        Err(PostError::Pagination(_))
    ));
}
