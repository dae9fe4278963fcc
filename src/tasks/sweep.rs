//! Periodic inactivity reminder sweep.
//!
//! One batch run visits every qualifying account and attempts its reminder
//! independently: a failing account is recorded and the batch moves on.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::histogram;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{error, info, warn};

use crate::domain::users::UserRecord;

use super::catalog::{InactivityReminderPayload, render_email};
use super::error::TaskError;
use super::ports::Mailer;
use super::queue::TaskQueue;
use super::registry::TaskHandler;

pub const INACTIVITY_SWEEP: &str = "inactivity_sweep";

const METRIC_SWEEP_MS: &str = "dailyblog_sweep_ms";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    pub item: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<SweepFailure>,
}

/// Apply `action` to every item in order, isolating failures per item.
pub async fn sweep_each<T, I, D, F, Fut, E>(items: I, describe: D, mut action: F) -> SweepReport
where
    I: IntoIterator<Item = T>,
    D: Fn(&T) -> String,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let mut report = SweepReport::default();

    for item in items {
        let label = describe(&item);
        report.attempted += 1;
        match action(item).await {
            Ok(()) => report.succeeded += 1,
            Err(err) => {
                warn!(item = %label, error = %err, "Sweep item failed; continuing");
                report.failures.push(SweepFailure {
                    item: label,
                    error: err.to_string(),
                });
            }
        }
    }

    report
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("failed to load inactive accounts: {0}")]
    Source(String),
}

/// Source of accounts to remind.
#[async_trait]
pub trait InactiveAccounts: Send + Sync {
    /// Accounts whose last activity is strictly before `cutoff`.
    async fn inactive_before(&self, cutoff: OffsetDateTime) -> Result<Vec<UserRecord>, SweepError>;
}

/// Fixed account list, filtered on each query.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccounts {
    accounts: Vec<UserRecord>,
}

impl InMemoryAccounts {
    pub fn new(accounts: Vec<UserRecord>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl InactiveAccounts for InMemoryAccounts {
    async fn inactive_before(&self, cutoff: OffsetDateTime) -> Result<Vec<UserRecord>, SweepError> {
        Ok(self
            .accounts
            .iter()
            .filter(|account| account.last_active_at < cutoff)
            .cloned()
            .collect())
    }
}

pub struct ReminderSweep {
    accounts: Arc<dyn InactiveAccounts>,
    mailer: Arc<dyn Mailer>,
    from_email: String,
    inactive_after: Duration,
}

impl ReminderSweep {
    pub fn new(
        accounts: Arc<dyn InactiveAccounts>,
        mailer: Arc<dyn Mailer>,
        from_email: impl Into<String>,
        inactive_after: Duration,
    ) -> Self {
        Self {
            accounts,
            mailer,
            from_email: from_email.into(),
            inactive_after,
        }
    }

    fn cutoff(&self, now: OffsetDateTime) -> OffsetDateTime {
        time::Duration::try_from(self.inactive_after)
            .ok()
            .and_then(|window| now.checked_sub(window))
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Remind every account inactive at `now`. Fails only when the account
    /// source cannot be queried.
    pub async fn run_once(&self, now: OffsetDateTime) -> Result<SweepReport, SweepError> {
        let started = Instant::now();
        let accounts = self.accounts.inactive_before(self.cutoff(now)).await?;

        let report = sweep_each(
            accounts,
            |account: &UserRecord| account.username.clone(),
            |account| async move {
                let payload = InactivityReminderPayload {
                    days_inactive: (now - account.last_active_at).whole_days(),
                    username: account.username,
                    email: account.email,
                };
                self.mailer
                    .send(&render_email(&payload, &self.from_email))
                    .await
            },
        )
        .await;

        histogram!(METRIC_SWEEP_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "Inactivity reminder sweep finished"
        );

        Ok(report)
    }

    /// Enqueue the sweep task every `cadence` until the returned handle is
    /// aborted. The first run happens one full period after start.
    pub fn spawn_periodic(queue: Arc<dyn TaskQueue>, cadence: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(err) = queue.enqueue(INACTIVITY_SWEEP, Value::Null).await {
                    error!(error = %err, "Failed to schedule inactivity sweep; stopping");
                    return;
                }
            }
        })
    }
}

/// Queue adapter: the sweep runs as a retryable task whose attempts fail
/// only when the account source is unreachable.
#[async_trait]
impl TaskHandler for ReminderSweep {
    async fn run(&self, _args: &Value) -> Result<(), TaskError> {
        self.run_once(OffsetDateTime::now_utc())
            .await
            .map(|_| ())
            .map_err(TaskError::failed)
    }

    fn describe_target(&self, _args: &Value) -> Option<String> {
        Some(format!(
            "accounts inactive for {} days",
            self.inactive_after.as_secs() / 86_400
        ))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::types::Role;
    use crate::tasks::ports::TracingMailer;

    fn account(id: u64, days_ago: i64, now: OffsetDateTime) -> UserRecord {
        UserRecord {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            role: Role::Author,
            last_active_at: now - time::Duration::days(days_ago),
        }
    }

    #[tokio::test]
    async fn sweep_each_isolates_failures() {
        let report = sweep_each(
            1..=5,
            |n: &i32| n.to_string(),
            |n| async move {
                if n == 3 { Err("boom") } else { Ok(()) }
            },
        )
        .await;

        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failures[0].item, "3");
    }

    #[tokio::test]
    async fn reminds_only_inactive_accounts() {
        let now = datetime!(2026-03-01 12:00 UTC);
        let accounts = InMemoryAccounts::new(vec![
            account(1, 30, now),
            account(2, 2, now),
            account(3, 11, now),
        ]);
        let mailer = Arc::new(TracingMailer::recording());
        let sweep = ReminderSweep::new(
            Arc::new(accounts),
            mailer.clone(),
            "noreply@x",
            Duration::from_secs(10 * 86_400),
        );

        let report = sweep.run_once(now).await.unwrap();

        assert_eq!(report.succeeded, 2);
        let recipients: Vec<String> = mailer.outbox().into_iter().map(|m| m.to).collect();
        assert_eq!(recipients, vec!["user1@example.com", "user3@example.com"]);
        assert!(mailer.outbox()[0].body.contains("30 days"));
    }
}
