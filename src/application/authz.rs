//! Authorization predicates.
//!
//! Each check is independent; callers combine them explicitly, e.g.
//! `is_author(viewer) && owns_post(viewer, post)`. `None` is an anonymous
//! viewer.

use crate::domain::posts::PostRecord;
use crate::domain::types::Role;
use crate::domain::users::UserRecord;

pub fn is_authenticated(viewer: Option<&UserRecord>) -> bool {
    viewer.is_some()
}

/// Exact role match; admins do not implicitly hold the author role.
pub fn has_role(viewer: Option<&UserRecord>, role: Role) -> bool {
    viewer.is_some_and(|user| user.role == role)
}

pub fn is_author(viewer: Option<&UserRecord>) -> bool {
    has_role(viewer, Role::Author)
}

pub fn is_admin(viewer: Option<&UserRecord>) -> bool {
    has_role(viewer, Role::Admin)
}

pub fn owns_post(viewer: Option<&UserRecord>, post: &PostRecord) -> bool {
    viewer.is_some_and(|user| user.id == post.author.id)
}

/// Editing and deleting require the author role and ownership.
pub fn can_modify_post(viewer: Option<&UserRecord>, post: &PostRecord) -> bool {
    is_author(viewer) && owns_post(viewer, post)
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::domain::posts::AuthorRef;

    fn user(id: u64, role: Role) -> UserRecord {
        UserRecord {
            id,
            username: format!("u{id}"),
            email: format!("u{id}@example.com"),
            role,
            last_active_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn post_by(author: &UserRecord) -> PostRecord {
        PostRecord {
            id: 1,
            title: "t".into(),
            content: "c".into(),
            content_nature: "n".into(),
            author: AuthorRef {
                id: author.id,
                username: author.username.clone(),
            },
            date_posted: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn anonymous_viewer_fails_every_check() {
        let owner = user(1, Role::Author);
        let post = post_by(&owner);

        assert!(!is_authenticated(None));
        assert!(!is_author(None));
        assert!(!owns_post(None, &post));
        assert!(!can_modify_post(None, &post));
    }

    #[test]
    fn modify_requires_role_and_ownership() {
        let owner = user(1, Role::Author);
        let other_author = user(2, Role::Author);
        let demoted_owner = user(1, Role::Reader);
        let admin = user(3, Role::Admin);
        let post = post_by(&owner);

        assert!(can_modify_post(Some(&owner), &post));
        assert!(!can_modify_post(Some(&other_author), &post));
        assert!(!can_modify_post(Some(&demoted_owner), &post));
        assert!(!can_modify_post(Some(&admin), &post));
        assert!(is_admin(Some(&admin)));
        assert!(!is_author(Some(&admin)));
    }
}
