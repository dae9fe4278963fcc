//! Concrete tasks of the blog platform.
//!
//! Every email task deserializes its payload, renders a plain-text message and
//! hands it to the [`Mailer`]. Transport errors fail the attempt so the queue
//! retries it.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::domain::posts::PostId;
use crate::domain::users::UserId;

use super::error::TaskError;
use super::ports::{EmailMessage, ImageProcessor, ImageSpec, Mailer, UserDirectory};
use super::registry::{RegistryError, TaskHandler, TaskRegistry};
use super::retry::RetryPolicy;

pub const SEND_WELCOME_EMAIL: &str = "send_welcome_email";
pub const PROFILE_UPDATE_EMAIL: &str = "profile_update_email";
pub const POST_CREATED_EMAIL: &str = "post_created_email";
pub const POST_UPDATED_EMAIL: &str = "post_updated_email";
pub const POST_DELETED_EMAIL: &str = "post_deleted_email";
pub const PROCESS_PROFILE_IMAGE: &str = "process_profile_image";
pub const DONATION_APPRECIATION_EMAIL: &str = "donation_appreciation_email";
pub const INACTIVITY_REMINDER_EMAIL: &str = "inactivity_reminder_email";

const SIGNATURE: &str = "The MyDailyBlog Team";

/// A payload that renders into one email.
pub trait EmailPayload: DeserializeOwned + Send + Sync + 'static {
    fn recipient(&self) -> &str;
    fn subject(&self) -> String;
    fn body(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeEmailPayload {
    pub username: String,
    pub email: String,
}

impl EmailPayload for WelcomeEmailPayload {
    fn recipient(&self) -> &str {
        &self.email
    }

    fn subject(&self) -> String {
        "Welcome to MyDailyBlog".to_string()
    }

    fn body(&self) -> String {
        format!(
            "Hi {},\n\nWelcome to MyDailyBlog! We're happy to have you on board.\n\n{SIGNATURE}",
            self.username
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdateEmailPayload {
    pub username: String,
    pub email: String,
}

impl EmailPayload for ProfileUpdateEmailPayload {
    fn recipient(&self) -> &str {
        &self.email
    }

    fn subject(&self) -> String {
        "Profile updated".to_string()
    }

    fn body(&self) -> String {
        format!(
            "Hi {},\n\nYour profile has been updated.\n\n{SIGNATURE}",
            self.username
        )
    }
}

/// Payload of the created and updated post notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEmailPayload {
    pub username: String,
    pub email: String,
    pub post_id: PostId,
}

/// Wrapper selecting the "created" wording for a [`PostEmailPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostCreatedEmail(pub PostEmailPayload);

impl EmailPayload for PostCreatedEmail {
    fn recipient(&self) -> &str {
        &self.0.email
    }

    fn subject(&self) -> String {
        "Post created successfully".to_string()
    }

    fn body(&self) -> String {
        format!(
            "Hi {},\n\nYou successfully created a post on MyDailyBlog, I hope it was a good experience for you.\n",
            self.0.username
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostUpdatedEmail(pub PostEmailPayload);

impl EmailPayload for PostUpdatedEmail {
    fn recipient(&self) -> &str {
        &self.0.email
    }

    fn subject(&self) -> String {
        "Updated post successfully".to_string()
    }

    fn body(&self) -> String {
        format!(
            "Hi {},\n\nYou successfully updated a blog on MyDailyBlog\n",
            self.0.username
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDeletedEmailPayload {
    pub username: String,
    pub email: String,
    pub post_title: String,
}

impl EmailPayload for PostDeletedEmailPayload {
    fn recipient(&self) -> &str {
        &self.email
    }

    fn subject(&self) -> String {
        "Post Deleted Successfully".to_string()
    }

    fn body(&self) -> String {
        format!(
            "Hi {},\n\nYour post \"{}\" has been successfully deleted from MyDailyBlog.\n\nYou can always create new posts anytime!\n",
            self.username, self.post_title
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationAppreciationPayload {
    pub donor_name: String,
    pub donor_email: String,
}

impl EmailPayload for DonationAppreciationPayload {
    fn recipient(&self) -> &str {
        &self.donor_email
    }

    fn subject(&self) -> String {
        "Thank You for Your Donation".to_string()
    }

    fn body(&self) -> String {
        format!(
            "Dear {},\n\nThank you for your generous donation! Your support means a lot to us.\n\nWarm regards,\n{SIGNATURE}",
            self.donor_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivityReminderPayload {
    pub username: String,
    pub email: String,
    pub days_inactive: i64,
}

impl EmailPayload for InactivityReminderPayload {
    fn recipient(&self) -> &str {
        &self.email
    }

    fn subject(&self) -> String {
        "We miss you on MyDailyBlog".to_string()
    }

    fn body(&self) -> String {
        format!(
            "Hi {},\n\nIt has been {} days since your last visit. Your readers are waiting for your next post!\n\n{SIGNATURE}",
            self.username, self.days_inactive
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileImagePayload {
    pub user_id: UserId,
    pub image_path: String,
}

pub(crate) fn decode<P: DeserializeOwned>(args: &Value) -> Result<P, TaskError> {
    P::deserialize(args).map_err(|err| TaskError::InvalidPayload(err.to_string()))
}

/// Render `payload` into a message sent from `from`.
pub fn render_email<P: EmailPayload>(payload: &P, from: &str) -> EmailMessage {
    EmailMessage {
        from: from.to_string(),
        to: payload.recipient().to_string(),
        subject: payload.subject(),
        body: payload.body(),
    }
}

/// Generic handler for every [`EmailPayload`].
pub struct EmailTask<P> {
    mailer: Arc<dyn Mailer>,
    from: String,
    payload: PhantomData<fn() -> P>,
}

impl<P> EmailTask<P> {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
            payload: PhantomData,
        }
    }
}

#[async_trait]
impl<P: EmailPayload> TaskHandler for EmailTask<P> {
    async fn run(&self, args: &Value) -> Result<(), TaskError> {
        let payload: P = decode(args)?;
        let message = render_email(&payload, &self.from);
        self.mailer.send(&message).await.map_err(TaskError::failed)
    }

    fn describe_target(&self, args: &Value) -> Option<String> {
        decode::<P>(args)
            .ok()
            .map(|payload| payload.recipient().to_string())
    }
}

/// Resizes a freshly uploaded profile image. A deleted account fails the
/// task at once; lookup and image errors are retried.
pub struct ProfileImageTask {
    users: Arc<dyn UserDirectory>,
    images: Arc<dyn ImageProcessor>,
    spec: ImageSpec,
}

impl ProfileImageTask {
    pub fn new(users: Arc<dyn UserDirectory>, images: Arc<dyn ImageProcessor>) -> Self {
        Self {
            users,
            images,
            spec: ImageSpec::default(),
        }
    }
}

#[async_trait]
impl TaskHandler for ProfileImageTask {
    async fn run(&self, args: &Value) -> Result<(), TaskError> {
        let payload: ProfileImagePayload = decode(args)?;
        let exists = self
            .users
            .user_exists(payload.user_id)
            .await
            .map_err(TaskError::failed)?;
        if !exists {
            return Err(TaskError::permanent(format!(
                "user {} not found during image processing",
                payload.user_id
            )));
        }

        self.images
            .optimize(&payload.image_path, self.spec)
            .await
            .map_err(TaskError::failed)
    }

    fn describe_target(&self, args: &Value) -> Option<String> {
        decode::<ProfileImagePayload>(args)
            .ok()
            .map(|payload| format!("user:{}", payload.user_id))
    }
}

/// Collaborators the catalog's handlers need.
#[derive(Clone)]
pub struct CatalogContext {
    pub mailer: Arc<dyn Mailer>,
    pub users: Arc<dyn UserDirectory>,
    pub images: Arc<dyn ImageProcessor>,
    pub from_email: String,
}

/// Register every catalog task. The donation email is best-effort and gets a
/// single attempt; all other tasks use the registry's default policy.
pub fn register_catalog(
    registry: &mut TaskRegistry,
    ctx: &CatalogContext,
) -> Result<(), RegistryError> {
    let mailer = &ctx.mailer;
    let from = ctx.from_email.as_str();

    registry.register(
        SEND_WELCOME_EMAIL,
        EmailTask::<WelcomeEmailPayload>::new(mailer.clone(), from),
    )?;
    registry.register(
        PROFILE_UPDATE_EMAIL,
        EmailTask::<ProfileUpdateEmailPayload>::new(mailer.clone(), from),
    )?;
    registry.register(
        POST_CREATED_EMAIL,
        EmailTask::<PostCreatedEmail>::new(mailer.clone(), from),
    )?;
    registry.register(
        POST_UPDATED_EMAIL,
        EmailTask::<PostUpdatedEmail>::new(mailer.clone(), from),
    )?;
    registry.register(
        POST_DELETED_EMAIL,
        EmailTask::<PostDeletedEmailPayload>::new(mailer.clone(), from),
    )?;
    registry.register(
        INACTIVITY_REMINDER_EMAIL,
        EmailTask::<InactivityReminderPayload>::new(mailer.clone(), from),
    )?;
    registry.register_with_policy(
        DONATION_APPRECIATION_EMAIL,
        EmailTask::<DonationAppreciationPayload>::new(mailer.clone(), from),
        RetryPolicy::single_attempt(),
    )?;
    registry.register(
        PROCESS_PROFILE_IMAGE,
        ProfileImageTask::new(ctx.users.clone(), ctx.images.clone()),
    )?;

    Ok(())
}
