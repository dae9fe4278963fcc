use thiserror::Error;

use super::state::TaskId;

/// Failure of a single task attempt.
///
/// Every variant except [`TaskError::Permanent`] counts as an attempt failure
/// and is retried while the attempt budget lasts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("{message}")]
    Failed { message: String },
    /// Retrying cannot help; the task fails terminally at once.
    #[error("{message}")]
    Permanent { message: String },
    #[error("invalid task payload: {0}")]
    InvalidPayload(String),
    #[error("no handler registered for task `{0}`")]
    HandlerNotFound(String),
}

impl TaskError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent { .. })
    }

    /// Convert any error into a [`TaskError::Failed`].
    pub fn failed<E>(err: E) -> Self
    where
        E: std::error::Error,
    {
        Self::message(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("task queue is closed")]
    Closed,
    #[error("task payload could not be encoded: {0}")]
    Payload(String),
    #[error("task `{0}` not found")]
    NotFound(TaskId),
    #[error("task `{id}` did not finish within {timeout:?}")]
    Timeout {
        id: TaskId,
        timeout: std::time::Duration,
    },
    #[error("{in_flight} tasks still in flight after {timeout:?}")]
    Busy {
        in_flight: usize,
        timeout: std::time::Duration,
    },
}
