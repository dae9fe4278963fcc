//! Post-commit side effects of blog mutations.
//!
//! Every hook is registered on a [`Transaction`] and fires only after commit.
//! For post mutations, cache invalidation completes before the notification
//! task is enqueued.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{InvalidationTrigger, PostMutation};
use crate::domain::posts::PostRecord;
use crate::domain::types::MutationKind;
use crate::domain::users::UserRecord;
use crate::tasks::{
    DONATION_APPRECIATION_EMAIL, DonationAppreciationPayload, POST_CREATED_EMAIL,
    POST_DELETED_EMAIL, POST_UPDATED_EMAIL, PROCESS_PROFILE_IMAGE, PROFILE_UPDATE_EMAIL,
    PostDeletedEmailPayload, PostEmailPayload, ProfileImagePayload, ProfileUpdateEmailPayload,
    SEND_WELCOME_EMAIL, TaskQueue, Transaction, WelcomeEmailPayload, enqueue_task,
};

#[derive(Clone)]
pub struct MutationHooks {
    trigger: Arc<InvalidationTrigger>,
    queue: Arc<dyn TaskQueue>,
}

impl MutationHooks {
    pub fn new(trigger: Arc<InvalidationTrigger>, queue: Arc<dyn TaskQueue>) -> Self {
        Self { trigger, queue }
    }

    pub fn post_created(&self, tx: &mut Transaction, post: &PostRecord, author: &UserRecord) {
        let payload = PostEmailPayload {
            username: author.username.clone(),
            email: author.email.clone(),
            post_id: post.id,
        };
        self.post_mutated(tx, post, MutationKind::Created, POST_CREATED_EMAIL, payload);
    }

    pub fn post_updated(&self, tx: &mut Transaction, post: &PostRecord, author: &UserRecord) {
        let payload = PostEmailPayload {
            username: author.username.clone(),
            email: author.email.clone(),
            post_id: post.id,
        };
        self.post_mutated(tx, post, MutationKind::Updated, POST_UPDATED_EMAIL, payload);
    }

    pub fn post_deleted(&self, tx: &mut Transaction, post: &PostRecord, author: &UserRecord) {
        let payload = PostDeletedEmailPayload {
            username: author.username.clone(),
            email: author.email.clone(),
            post_title: post.title.clone(),
        };
        self.post_mutated(tx, post, MutationKind::Deleted, POST_DELETED_EMAIL, payload);
    }

    pub fn user_registered(&self, tx: &mut Transaction, user: &UserRecord) {
        let payload = WelcomeEmailPayload {
            username: user.username.clone(),
            email: user.email.clone(),
        };
        let queue = self.queue.clone();
        tx.on_commit("user_registered", move || async move {
            schedule(queue.as_ref(), SEND_WELCOME_EMAIL, &payload).await;
        });
    }

    /// `new_image` is the stored path of a freshly uploaded profile image,
    /// if the update changed it.
    pub fn profile_updated(
        &self,
        tx: &mut Transaction,
        user: &UserRecord,
        new_image: Option<String>,
    ) {
        let image = new_image.map(|image_path| ProfileImagePayload {
            user_id: user.id,
            image_path,
        });
        let email = ProfileUpdateEmailPayload {
            username: user.username.clone(),
            email: user.email.clone(),
        };
        let queue = self.queue.clone();
        tx.on_commit("profile_updated", move || async move {
            if let Some(image) = image {
                schedule(queue.as_ref(), PROCESS_PROFILE_IMAGE, &image).await;
            }
            schedule(queue.as_ref(), PROFILE_UPDATE_EMAIL, &email).await;
        });
    }

    pub fn donation_received(
        &self,
        tx: &mut Transaction,
        donor_name: impl Into<String>,
        donor_email: impl Into<String>,
    ) {
        let payload = DonationAppreciationPayload {
            donor_name: donor_name.into(),
            donor_email: donor_email.into(),
        };
        let queue = self.queue.clone();
        tx.on_commit("donation_received", move || async move {
            schedule(queue.as_ref(), DONATION_APPRECIATION_EMAIL, &payload).await;
        });
    }

    fn post_mutated<P>(
        &self,
        tx: &mut Transaction,
        post: &PostRecord,
        kind: MutationKind,
        task: &'static str,
        payload: P,
    ) where
        P: Serialize + Send + Sync + 'static,
    {
        let mutation = PostMutation::new(post.id, post.author.username.clone(), kind);
        let trigger = self.trigger.clone();
        let queue = self.queue.clone();
        tx.on_commit("post_mutated", move || async move {
            trigger.on_post_mutated(&mutation).await;
            schedule(queue.as_ref(), task, &payload).await;
        });
    }
}

/// Fire-and-forget enqueue; failures are logged and never reach the caller.
async fn schedule<P: Serialize>(queue: &dyn TaskQueue, name: &'static str, payload: &P) {
    match enqueue_task(queue, name, payload).await {
        Ok(handle) => info!(task = name, task_id = %handle.id, "Task queued"),
        Err(err) => warn!(task = name, error = %err, "Failed to queue task"),
    }
}
