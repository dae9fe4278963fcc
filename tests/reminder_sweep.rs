//! Inactivity sweep: per-account failures are isolated from the batch.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dailyblog::domain::types::Role;
use dailyblog::domain::users::UserRecord;
use dailyblog::infra::memory::InMemoryBlog;
use dailyblog::tasks::{
    EmailMessage, INACTIVITY_SWEEP, InMemoryAccounts, MailError, Mailer, MemoryTaskQueue,
    ReminderSweep, TaskQueue, TaskRegistry, TaskState,
};
use serde_json::Value;
use time::OffsetDateTime;

/// Rejects mail for one recipient and records the rest.
struct SelectiveMailer {
    reject: String,
    delivered: Mutex<Vec<String>>,
}

impl SelectiveMailer {
    fn rejecting(address: &str) -> Self {
        Self {
            reject: address.to_string(),
            delivered: Mutex::new(Vec::new()),
        }
    }

    fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for SelectiveMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if message.to == self.reject {
            return Err(MailError::Rejected {
                recipient: message.to.clone(),
                reason: "mailbox unavailable".into(),
            });
        }
        self.delivered.lock().unwrap().push(message.to.clone());
        Ok(())
    }
}

fn account(id: u64, days_ago: i64, now: OffsetDateTime) -> UserRecord {
    UserRecord {
        id,
        username: format!("user{id}"),
        email: format!("user{id}@example.com"),
        role: Role::Reader,
        last_active_at: now - time::Duration::days(days_ago),
    }
}

const THIRTY_DAYS: Duration = Duration::from_secs(30 * 86_400);

#[tokio::test]
async fn one_failing_account_does_not_abort_the_batch() {
    let now = OffsetDateTime::now_utc();
    let accounts = (1..=5).map(|id| account(id, 45, now)).collect();
    let mailer = Arc::new(SelectiveMailer::rejecting("user3@example.com"));
    let sweep = ReminderSweep::new(
        Arc::new(InMemoryAccounts::new(accounts)),
        mailer.clone(),
        "noreply@example.com",
        THIRTY_DAYS,
    );

    let report = sweep.run_once(now).await.unwrap();

    assert_eq!(report.attempted, 5);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].item, "user3");
    assert!(report.failures[0].error.contains("user3@example.com"));
    assert_eq!(mailer.delivered().len(), 4);
}

#[tokio::test]
async fn sweep_reads_accounts_from_the_blog_store() {
    let now = OffsetDateTime::now_utc();
    let blog = Arc::new(InMemoryBlog::new());
    blog.add_user(account(1, 2, now));
    blog.add_user(account(2, 31, now));
    blog.add_user(account(3, 90, now));
    let mailer = Arc::new(SelectiveMailer::rejecting("nobody@example.com"));
    let sweep = ReminderSweep::new(blog, mailer.clone(), "noreply@example.com", THIRTY_DAYS);

    let report = sweep.run_once(now).await.unwrap();

    assert_eq!(report.attempted, 2);
    let mut delivered = mailer.delivered();
    delivered.sort();
    assert_eq!(delivered, vec!["user2@example.com", "user3@example.com"]);
}

#[tokio::test]
async fn sweep_runs_as_a_queued_task() {
    let now = OffsetDateTime::now_utc();
    let accounts = (1..=3).map(|id| account(id, 60, now)).collect();
    let mailer = Arc::new(SelectiveMailer::rejecting("user2@example.com"));
    let sweep = ReminderSweep::new(
        Arc::new(InMemoryAccounts::new(accounts)),
        mailer.clone(),
        "noreply@example.com",
        THIRTY_DAYS,
    );

    let mut registry = TaskRegistry::default();
    registry.register(INACTIVITY_SWEEP, sweep).unwrap();
    let queue = MemoryTaskQueue::new(registry);

    let handle = queue.enqueue(INACTIVITY_SWEEP, Value::Null).await.unwrap();
    let record = queue
        .wait_for(handle.id, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(record.state, TaskState::Succeeded);
    assert_eq!(record.attempt_count, 1);
    assert_eq!(mailer.delivered().len(), 2);
}
