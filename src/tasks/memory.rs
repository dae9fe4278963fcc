//! In-process task queue.
//!
//! Each enqueued task runs on its own tokio task, so concurrency is unbounded
//! and tasks for different entities proceed independently. Records of
//! finished tasks are kept for inspection up to a fixed count; the oldest
//! finished record is dropped first.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use lru::LruCache;
use metrics::counter;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, error};

use super::error::{QueueError, TaskError};
use super::queue::{TaskHandle, TaskQueue};
use super::registry::TaskRegistry;
use super::runner::{METRIC_TASK_FAILED, run_with_retry};
use super::state::{TaskId, TaskRecord, TaskState};
use crate::cache::mutex_lock;

const SOURCE: &str = "tasks::memory";
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_RETAINED_RECORDS: usize = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub pending: usize,
    pub running: usize,
    pub retrying: usize,
    pub succeeded: usize,
    pub failed_terminal: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.pending + self.running + self.retrying + self.succeeded + self.failed_terminal
    }

    pub fn in_flight(&self) -> usize {
        self.pending + self.running + self.retrying
    }
}

struct Inner {
    registry: TaskRegistry,
    records: DashMap<TaskId, TaskRecord>,
    finished: Mutex<LruCache<TaskId, ()>>,
    enqueued: AtomicUsize,
    closed: AtomicBool,
}

impl Inner {
    /// Store the latest snapshot of a record. Terminal records count against
    /// the retention limit and push out the oldest finished one.
    fn store(&self, record: TaskRecord) {
        let id = record.id;
        let terminal = record.state.is_terminal();
        self.records.insert(id, record);
        if !terminal {
            return;
        }

        let evicted = mutex_lock(&self.finished, SOURCE, "store").push(id, ());
        if let Some((old, ())) = evicted
            && old != id
        {
            self.records.remove(&old);
            debug!(task_id = %old, "Finished task record dropped");
        }
    }
}

/// [`TaskQueue`] backed by tokio tasks and a concurrent record map.
#[derive(Clone)]
pub struct MemoryTaskQueue {
    inner: Arc<Inner>,
}

impl MemoryTaskQueue {
    pub fn new(registry: TaskRegistry) -> Self {
        let retained = NonZeroUsize::new(DEFAULT_RETAINED_RECORDS).unwrap_or(NonZeroUsize::MIN);
        Self::with_retention(registry, retained)
    }

    /// Keep at most `retained` finished records. Tasks still in flight are
    /// always tracked.
    pub fn with_retention(registry: TaskRegistry, retained: NonZeroUsize) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                records: DashMap::new(),
                finished: Mutex::new(LruCache::new(retained)),
                enqueued: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.inner.registry
    }

    /// Number of successful `enqueue` calls, including tasks whose records
    /// have since been dropped.
    pub fn enqueued_count(&self) -> usize {
        self.inner.enqueued.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self, id: TaskId) -> Option<TaskRecord> {
        self.inner.records.get(&id).map(|entry| entry.value().clone())
    }

    pub fn records(&self) -> Vec<TaskRecord> {
        let mut records: Vec<TaskRecord> = self
            .inner
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.enqueued_at);
        records
    }

    pub fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for entry in self.inner.records.iter() {
            match entry.value().state {
                TaskState::Pending => counts.pending += 1,
                TaskState::Running => counts.running += 1,
                TaskState::Retrying => counts.retrying += 1,
                TaskState::Succeeded => counts.succeeded += 1,
                TaskState::FailedTerminal => counts.failed_terminal += 1,
            }
        }
        counts
    }

    /// Stop accepting new tasks. Tasks already enqueued keep running.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Block until the task reaches a terminal state or the timeout elapses,
    /// returning the final snapshot.
    pub async fn wait_for(&self, id: TaskId, timeout: Duration) -> Result<TaskRecord, QueueError> {
        let deadline = Instant::now() + timeout;

        loop {
            let record = self.snapshot(id).ok_or(QueueError::NotFound(id))?;
            if record.state.is_terminal() {
                return Ok(record);
            }
            if Instant::now() >= deadline {
                return Err(QueueError::Timeout { id, timeout });
            }
            sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Block until no task is pending, running or retrying.
    pub async fn wait_idle(&self, timeout: Duration) -> Result<QueueCounts, QueueError> {
        let deadline = Instant::now() + timeout;

        loop {
            let counts = self.counts();
            if counts.in_flight() == 0 {
                return Ok(counts);
            }
            if Instant::now() >= deadline {
                return Err(QueueError::Busy {
                    in_flight: counts.in_flight(),
                    timeout,
                });
            }
            sleep(WAIT_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn enqueue(&self, name: &str, args: Value) -> Result<TaskHandle, QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        let policy = self
            .inner
            .registry
            .get(name)
            .map(|registration| registration.policy)
            .unwrap_or_else(|| self.inner.registry.default_policy());
        let record = TaskRecord::new(name, args, policy.max_attempts);
        let handle = TaskHandle {
            id: record.id,
            name: record.name.clone(),
        };

        self.inner.store(record);
        self.inner.enqueued.fetch_add(1, Ordering::SeqCst);
        debug!(task = %handle.name, task_id = %handle.id, "Task enqueued");

        tokio::spawn(drive(self.inner.clone(), handle.id));
        Ok(handle)
    }
}

async fn drive(inner: Arc<Inner>, id: TaskId) {
    let Some(mut record) = inner.records.get(&id).map(|entry| entry.value().clone()) else {
        return;
    };

    let Some(registration) = inner.registry.get(&record.name) else {
        let err = TaskError::HandlerNotFound(record.name.clone());
        record.abandon(err.to_string());
        counter!(METRIC_TASK_FAILED, "task" => record.name.clone()).increment(1);
        error!(
            task = %record.name,
            task_id = %record.id,
            error = %err,
            "Task dropped: no handler registered"
        );
        inner.store(record);
        return;
    };

    run_with_retry(
        &mut record,
        registration.handler.as_ref(),
        &registration.policy,
        |snapshot| inner.store(snapshot.clone()),
    )
    .await;
}
