//! Collaborator ports used by the task catalog.
//!
//! Email transport and image processing are external black boxes; the
//! tracing-backed implementations stand in for them in development.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::cache::mutex_lock;
use crate::domain::users::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("recipient `{recipient}` rejected: {reason}")]
    Rejected { recipient: String, reason: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Mailer that writes messages to the log instead of delivering them.
///
/// Only a mailer built with [`TracingMailer::recording`] keeps the messages.
#[derive(Debug, Default)]
pub struct TracingMailer {
    outbox: Option<Mutex<Vec<EmailMessage>>>,
}

impl TracingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer that also keeps every message in its outbox.
    pub fn recording() -> Self {
        Self {
            outbox: Some(Mutex::new(Vec::new())),
        }
    }

    /// Messages "sent" so far, oldest first. Always empty unless recording.
    pub fn outbox(&self) -> Vec<EmailMessage> {
        self.outbox
            .as_ref()
            .map(|outbox| mutex_lock(outbox, "mailer", "outbox").clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for TracingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Email sent"
        );
        if let Some(outbox) = &self.outbox {
            mutex_lock(outbox, "mailer", "send").push(message.clone());
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// Account lookup for tasks that act on a user.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_exists(&self, id: UserId) -> Result<bool, DirectoryError>;
}

/// Resize target for profile images: fit inside the bounds, keep the aspect
/// ratio, never enlarge, re-encode as JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 800,
            jpeg_quality: 85,
        }
    }
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image `{0}` not found")]
    NotFound(String),
    #[error("image processing failed: {0}")]
    Processing(String),
}

#[async_trait]
pub trait ImageProcessor: Send + Sync {
    /// Replace the image at `path` with a resized, recompressed version.
    async fn optimize(&self, path: &str, spec: ImageSpec) -> Result<(), ImageError>;
}

/// Image processor that only logs the requested transformation.
#[derive(Debug, Default)]
pub struct TracingImageProcessor;

#[async_trait]
impl ImageProcessor for TracingImageProcessor {
    async fn optimize(&self, path: &str, spec: ImageSpec) -> Result<(), ImageError> {
        if path.is_empty() {
            return Err(ImageError::NotFound(path.to_string()));
        }
        info!(
            path,
            max_width = spec.max_width,
            max_height = spec.max_height,
            quality = spec.jpeg_quality,
            "Image optimized"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            from: "noreply@example.com".into(),
            to: "ann@example.com".into(),
            subject: "Hi".into(),
            body: "Hello".into(),
        }
    }

    #[tokio::test]
    async fn recording_mailer_keeps_outbox() {
        let mailer = TracingMailer::recording();

        mailer.send(&message()).await.unwrap();
        assert_eq!(mailer.outbox(), vec![message()]);
    }

    #[tokio::test]
    async fn default_mailer_retains_nothing() {
        let mailer = TracingMailer::new();

        for _ in 0..1000 {
            mailer.send(&message()).await.unwrap();
        }
        assert!(mailer.outbox().is_empty());
    }

    #[tokio::test]
    async fn empty_image_path_is_not_found() {
        let err = TracingImageProcessor
            .optimize("", ImageSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::NotFound(_)));
    }
}
