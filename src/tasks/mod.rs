//! Retryable background tasks.
//!
//! Tasks are handed to a [`TaskQueue`] by name with a JSON payload and run
//! out-of-band. A worker drives each instance through
//! `Pending -> Running -> {Succeeded, Retrying, FailedTerminal}` with a fixed
//! backoff between attempts. Scheduling goes through [`Transaction::on_commit`]
//! so a rolled-back mutation never enqueues anything.

mod catalog;
mod commit;
mod error;
mod memory;
mod ports;
mod queue;
mod registry;
mod retry;
mod runner;
mod state;
mod sweep;

pub use catalog::{
    CatalogContext, DONATION_APPRECIATION_EMAIL, DonationAppreciationPayload, EmailPayload,
    EmailTask, INACTIVITY_REMINDER_EMAIL, InactivityReminderPayload, POST_CREATED_EMAIL,
    POST_DELETED_EMAIL, POST_UPDATED_EMAIL, PROCESS_PROFILE_IMAGE, PROFILE_UPDATE_EMAIL,
    PostCreatedEmail, PostDeletedEmailPayload, PostEmailPayload, PostUpdatedEmail,
    ProfileImagePayload, ProfileImageTask, ProfileUpdateEmailPayload, SEND_WELCOME_EMAIL,
    WelcomeEmailPayload, register_catalog, render_email,
};
pub use commit::Transaction;
pub use error::{QueueError, TaskError};
pub use memory::{DEFAULT_RETAINED_RECORDS, MemoryTaskQueue, QueueCounts};
pub use ports::{
    DirectoryError, EmailMessage, ImageError, ImageProcessor, ImageSpec, MailError, Mailer,
    TracingImageProcessor, TracingMailer, UserDirectory,
};
pub use queue::{TaskHandle, TaskQueue, enqueue_task};
pub use registry::{FnHandler, Registration, RegistryError, TaskHandler, TaskRegistry, handler_fn};
pub use retry::{DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
pub use runner::run_with_retry;
pub use state::{TaskId, TaskRecord, TaskState};
pub use sweep::{
    INACTIVITY_SWEEP, InMemoryAccounts, InactiveAccounts, ReminderSweep, SweepError,
    SweepFailure, SweepReport, sweep_each,
};
