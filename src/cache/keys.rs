//! Cache key policy.
//!
//! Maps a logical resource to its cache key, and a post mutation to every key
//! that may hold stale data about that post.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::posts::PostId;

use super::events::PostMutation;

const GLOBAL_LIST_KEY: &str = "post_list_view";
const USER_LIST_PREFIX: &str = "user_posts_";
const DETAIL_PREFIX: &str = "post_detail_";
const SUMMARY_PREFIX: &str = "post_summary_";

/// Cache scope, used to pick the TTL of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    GlobalList,
    UserList,
    Detail,
    Summary,
}

impl Scope {
    pub const ALL: [Scope; 4] = [
        Scope::GlobalList,
        Scope::UserList,
        Scope::Detail,
        Scope::Summary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::GlobalList => "global_list",
            Scope::UserList => "user_list",
            Scope::Detail => "detail",
            Scope::Summary => "summary",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| scope.as_str() == value)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a cached resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceIdentity {
    /// All posts, newest first.
    GlobalList,
    /// Posts written by one author.
    UserList { username: String },
    /// A single post's detail page.
    Detail { post_id: PostId },
    /// AI summary of a single post.
    Summary { post_id: PostId },
}

impl ResourceIdentity {
    pub fn user_list(username: impl Into<String>) -> Self {
        Self::UserList {
            username: username.into(),
        }
    }

    pub fn detail(post_id: PostId) -> Self {
        Self::Detail { post_id }
    }

    pub fn summary(post_id: PostId) -> Self {
        Self::Summary { post_id }
    }

    pub fn scope(&self) -> Scope {
        match self {
            ResourceIdentity::GlobalList => Scope::GlobalList,
            ResourceIdentity::UserList { .. } => Scope::UserList,
            ResourceIdentity::Detail { .. } => Scope::Detail,
            ResourceIdentity::Summary { .. } => Scope::Summary,
        }
    }
}

/// A fully-qualified cache key string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pure mapping from identities to keys.
///
/// The optional prefix namespaces every key uniformly, so injectivity across
/// identities is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPolicy {
    prefix: String,
}

impl KeyPolicy {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key_for(&self, identity: &ResourceIdentity) -> CacheKey {
        let raw = match identity {
            ResourceIdentity::GlobalList => GLOBAL_LIST_KEY.to_string(),
            ResourceIdentity::UserList { username } => format!("{USER_LIST_PREFIX}{username}"),
            ResourceIdentity::Detail { post_id } => format!("{DETAIL_PREFIX}{post_id}"),
            ResourceIdentity::Summary { post_id } => format!("{SUMMARY_PREFIX}{post_id}"),
        };
        CacheKey(format!("{}{raw}", self.prefix))
    }

    /// Keys to delete after a post mutation: the global list, the author's
    /// list and the post's detail page. Always exactly these three.
    pub fn invalidation_keys_for(&self, mutation: &PostMutation) -> BTreeSet<CacheKey> {
        [
            ResourceIdentity::GlobalList,
            ResourceIdentity::user_list(mutation.author.as_str()),
            ResourceIdentity::detail(mutation.post_id),
        ]
        .iter()
        .map(|identity| self.key_for(identity))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::types::MutationKind;

    #[test]
    fn keys_are_deterministic() {
        let policy = KeyPolicy::default();
        let identity = ResourceIdentity::user_list("alice");
        assert_eq!(policy.key_for(&identity), policy.key_for(&identity));
        assert_eq!(policy.key_for(&identity).as_str(), "user_posts_alice");
        assert_eq!(
            policy.key_for(&ResourceIdentity::GlobalList).as_str(),
            "post_list_view"
        );
        assert_eq!(
            policy.key_for(&ResourceIdentity::detail(42)).as_str(),
            "post_detail_42"
        );
    }

    #[test]
    fn distinct_identities_never_collide() {
        let policy = KeyPolicy::new("blog:");
        let identities = vec![
            ResourceIdentity::GlobalList,
            ResourceIdentity::user_list(""),
            ResourceIdentity::user_list("1"),
            ResourceIdentity::user_list("post_list_view"),
            ResourceIdentity::user_list("post_detail_1"),
            ResourceIdentity::user_list("alice"),
            ResourceIdentity::user_list("Alice"),
            ResourceIdentity::detail(0),
            ResourceIdentity::detail(1),
            ResourceIdentity::detail(11),
            ResourceIdentity::summary(1),
        ];

        let keys: HashSet<_> = identities.iter().map(|i| policy.key_for(i)).collect();
        assert_eq!(keys.len(), identities.len());
    }

    #[test]
    fn prefix_applies_to_every_scope() {
        let policy = KeyPolicy::new("blog:");
        assert!(
            policy
                .key_for(&ResourceIdentity::detail(7))
                .as_str()
                .starts_with("blog:")
        );
        assert!(
            policy
                .key_for(&ResourceIdentity::GlobalList)
                .as_str()
                .starts_with("blog:")
        );
    }

    #[test]
    fn invalidation_covers_list_author_and_detail() {
        let policy = KeyPolicy::default();
        for kind in [
            MutationKind::Created,
            MutationKind::Updated,
            MutationKind::Deleted,
        ] {
            let mutation = PostMutation::new(9, "bob", kind);
            let keys = policy.invalidation_keys_for(&mutation);

            let expected: BTreeSet<_> = [
                policy.key_for(&ResourceIdentity::GlobalList),
                policy.key_for(&ResourceIdentity::user_list("bob")),
                policy.key_for(&ResourceIdentity::detail(9)),
            ]
            .into_iter()
            .collect();
            assert_eq!(keys, expected);
        }
    }

    #[test]
    fn scope_parse_matches_as_str() {
        for scope in Scope::ALL {
            assert_eq!(Scope::parse(scope.as_str()), Some(scope));
        }
        assert_eq!(Scope::parse("everything"), None);
    }
}
