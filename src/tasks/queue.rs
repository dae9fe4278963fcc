//! Task queue port.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::error::QueueError;
use super::state::TaskId;

/// Returned by [`TaskQueue::enqueue`]; the caller never waits on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: TaskId,
    pub name: String,
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Hand a task to the queue and return immediately.
    async fn enqueue(&self, name: &str, args: Value) -> Result<TaskHandle, QueueError>;
}

/// Enqueue a task with the provided payload.
pub async fn enqueue_task<Q, P>(
    queue: &Q,
    name: &str,
    payload: &P,
) -> Result<TaskHandle, QueueError>
where
    Q: TaskQueue + ?Sized,
    P: Serialize,
{
    let args = serde_json::to_value(payload).map_err(|err| QueueError::Payload(err.to_string()))?;
    queue.enqueue(name, args).await
}
