//! Commit-deferred execution.
//!
//! A [`Transaction`] collects post-commit hooks while a mutation is in
//! progress. They run, in registration order, only when the transaction
//! commits; rollback or drop discards them without running any.

use std::future::Future;

use futures::future::BoxFuture;
use tracing::{debug, warn};
use uuid::Uuid;

type CommitHook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

pub struct Transaction {
    id: Uuid,
    hooks: Vec<(&'static str, CommitHook)>,
    finished: bool,
}

impl Transaction {
    pub fn begin() -> Self {
        Self {
            id: Uuid::new_v4(),
            hooks: Vec::new(),
            finished: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pending_hooks(&self) -> usize {
        self.hooks.len()
    }

    /// Defer `hook` until this transaction commits.
    ///
    /// Hooks cannot fail the commit; they log their own errors.
    pub fn on_commit<F, Fut>(&mut self, label: &'static str, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks
            .push((label, Box::new(move || Box::pin(hook()) as BoxFuture<'static, ()>)));
    }

    /// Commit, then run the deferred hooks one after another. Returns the
    /// number of hooks run.
    pub async fn commit(mut self) -> usize {
        self.finished = true;
        let hooks = std::mem::take(&mut self.hooks);
        let count = hooks.len();

        for (label, hook) in hooks {
            debug!(tx = %self.id, hook = label, "Running post-commit hook");
            hook().await;
        }

        count
    }

    /// Roll back, discarding every deferred hook. Returns the number
    /// discarded.
    pub fn rollback(mut self) -> usize {
        self.finished = true;
        let discarded = std::mem::take(&mut self.hooks).len();
        debug!(tx = %self.id, discarded, "Transaction rolled back");
        discarded
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished && !self.hooks.is_empty() {
            warn!(
                tx = %self.id,
                discarded = self.hooks.len(),
                "Transaction dropped without commit; post-commit hooks discarded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> CommitHook) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |label: &'static str| -> CommitHook {
            let sink = sink.clone();
            Box::new(move || {
                Box::pin(async move {
                    sink.lock().unwrap().push(label);
                })
            })
        };
        (log, make)
    }

    #[tokio::test]
    async fn commit_runs_hooks_in_order() {
        let (log, make) = recorder();
        let mut tx = Transaction::begin();
        let first = make("invalidate");
        let second = make("enqueue");
        tx.on_commit("invalidate", first);
        tx.on_commit("enqueue", second);

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(tx.commit().await, 2);
        assert_eq!(*log.lock().unwrap(), vec!["invalidate", "enqueue"]);
    }

    #[tokio::test]
    async fn rollback_runs_nothing() {
        let (log, make) = recorder();
        let mut tx = Transaction::begin();
        tx.on_commit("enqueue", make("enqueue"));

        assert_eq!(tx.rollback(), 1);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn drop_runs_nothing() {
        let (log, make) = recorder();
        {
            let mut tx = Transaction::begin();
            tx.on_commit("enqueue", make("enqueue"));
            assert_eq!(tx.pending_hooks(), 1);
        }
        assert!(log.lock().unwrap().is_empty());
    }
}
