//! Task records and the per-instance state machine.
//!
//! Transitions:
//! - Pending -> Running
//! - Running -> Succeeded
//! - Running -> Retrying (attempt failed, budget left)
//! - Running -> FailedTerminal (attempt failed, budget exhausted)
//! - Retrying -> Pending (after the backoff delay)

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Retrying,
    Succeeded,
    FailedTerminal,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::FailedTerminal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Retrying => "retrying",
            TaskState::Succeeded => "succeeded",
            TaskState::FailedTerminal => "failed_terminal",
        }
    }

    pub fn can_transition_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::Running)
                | (TaskState::Running, TaskState::Succeeded)
                | (TaskState::Running, TaskState::Retrying)
                | (TaskState::Running, TaskState::FailedTerminal)
                | (TaskState::Retrying, TaskState::Pending)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Snapshot of one task instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub args: Value,
    /// Human-readable identity the task acts on, for remediation logs.
    pub target: Option<String>,
    pub state: TaskState,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub enqueued_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
}

impl TaskRecord {
    pub fn new(name: impl Into<String>, args: Value, max_attempts: u32) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            args,
            target: None,
            state: TaskState::Pending,
            attempt_count: 0,
            max_attempts: max_attempts.max(1),
            last_error: None,
            enqueued_at: OffsetDateTime::now_utc(),
            finished_at: None,
        }
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    pub fn attempts_left(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempt_count)
    }

    /// Pending -> Running. Returns the 1-based attempt number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.move_to(TaskState::Running);
        self.attempt_count += 1;
        self.attempt_count
    }

    /// Running -> Succeeded.
    pub fn record_success(&mut self) {
        self.move_to(TaskState::Succeeded);
        self.finished_at = Some(OffsetDateTime::now_utc());
    }

    /// Running -> Retrying while attempts remain, Running -> FailedTerminal
    /// once `attempt_count == max_attempts`.
    pub fn record_failure(&mut self, error: impl Into<String>) -> TaskState {
        self.last_error = Some(error.into());
        if self.attempt_count < self.max_attempts {
            self.move_to(TaskState::Retrying);
        } else {
            self.move_to(TaskState::FailedTerminal);
            self.finished_at = Some(OffsetDateTime::now_utc());
        }
        self.state
    }

    /// Running -> FailedTerminal regardless of the remaining budget.
    pub fn record_permanent_failure(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.move_to(TaskState::FailedTerminal);
        self.finished_at = Some(OffsetDateTime::now_utc());
    }

    /// Retrying -> Pending.
    pub fn resume(&mut self) {
        self.move_to(TaskState::Pending);
    }

    /// Marks a task that can never run, e.g. one without a handler.
    pub fn abandon(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.state = TaskState::FailedTerminal;
        self.finished_at = Some(OffsetDateTime::now_utc());
    }

    fn move_to(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid task transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }
}
