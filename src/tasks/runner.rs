//! Worker-side retry loop driving one task instance to a terminal state.

use metrics::counter;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::registry::TaskHandler;
use super::retry::RetryPolicy;
use super::state::{TaskRecord, TaskState};

pub(crate) const METRIC_TASK_ATTEMPT: &str = "dailyblog_task_attempt_total";
pub(crate) const METRIC_TASK_SUCCEEDED: &str = "dailyblog_task_succeeded_total";
pub(crate) const METRIC_TASK_FAILED: &str = "dailyblog_task_failed_total";

/// Run `record` with `handler` until it succeeds or its attempt budget is
/// spent, sleeping the fixed backoff between attempts.
///
/// `on_transition` observes the record after every state change. There is no
/// cancellation and no per-attempt timeout.
pub async fn run_with_retry<F>(
    record: &mut TaskRecord,
    handler: &dyn TaskHandler,
    policy: &RetryPolicy,
    mut on_transition: F,
) -> TaskState
where
    F: FnMut(&TaskRecord) + Send,
{
    if record.target.is_none() {
        record.target = handler.describe_target(&record.args);
    }
    let target = record.target.clone().unwrap_or_else(|| "-".to_string());

    loop {
        let attempt = record.begin_attempt();
        on_transition(record);
        counter!(METRIC_TASK_ATTEMPT, "task" => record.name.clone()).increment(1);

        let outcome = handler.run(&record.args).await;

        let err = match outcome {
            Ok(()) => {
                record.record_success();
                on_transition(record);
                counter!(METRIC_TASK_SUCCEEDED, "task" => record.name.clone()).increment(1);
                info!(
                    task = %record.name,
                    task_id = %record.id,
                    target = %target,
                    attempt,
                    "Task succeeded"
                );
                return TaskState::Succeeded;
            }
            Err(err) => err,
        };

        let next = if err.is_retryable() {
            record.record_failure(err.to_string())
        } else {
            record.record_permanent_failure(err.to_string());
            TaskState::FailedTerminal
        };

        match next {
            TaskState::Retrying => {
                let delay = policy.delay_after(attempt);
                warn!(
                    task = %record.name,
                    task_id = %record.id,
                    target = %target,
                    attempt,
                    max_attempts = record.max_attempts,
                    retry_in_secs = delay.as_secs(),
                    error = %err,
                    "Task attempt failed; retry scheduled"
                );
                on_transition(record);
                sleep(delay).await;
                record.resume();
                on_transition(record);
            }
            state => {
                on_transition(record);
                counter!(METRIC_TASK_FAILED, "task" => record.name.clone()).increment(1);
                error!(
                    task = %record.name,
                    task_id = %record.id,
                    target = %target,
                    attempts = record.attempt_count,
                    error = %err,
                    "Task failed terminally; manual remediation required"
                );
                return state;
            }
        }
    }
}
