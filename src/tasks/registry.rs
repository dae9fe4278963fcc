//! Handler registry: maps task names to handlers and their retry policy.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::error::TaskError;
use super::retry::RetryPolicy;

/// Worker-side implementation of one named task.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self, args: &Value) -> Result<(), TaskError>;

    /// Identity the task acts on (a recipient, a user id), used in logs.
    fn describe_target(&self, _args: &Value) -> Option<String> {
        None
    }
}

/// Adapter turning an async closure into a [`TaskHandler`].
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn run(&self, args: &Value) -> Result<(), TaskError> {
        (self.f)(args.clone()).await
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("handler for task `{0}` is already registered")]
    AlreadyRegistered(String),
}

#[derive(Clone)]
pub struct Registration {
    pub handler: Arc<dyn TaskHandler>,
    pub policy: RetryPolicy,
}

pub struct TaskRegistry {
    default_policy: RetryPolicy,
    handlers: HashMap<String, Registration>,
}

impl TaskRegistry {
    pub fn new(default_policy: RetryPolicy) -> Self {
        Self {
            default_policy,
            handlers: HashMap::new(),
        }
    }

    pub fn default_policy(&self) -> RetryPolicy {
        self.default_policy
    }

    pub fn register<H>(&mut self, name: &str, handler: H) -> Result<(), RegistryError>
    where
        H: TaskHandler + 'static,
    {
        self.register_with_policy(name, handler, self.default_policy)
    }

    pub fn register_with_policy<H>(
        &mut self,
        name: &str,
        handler: H,
        policy: RetryPolicy,
    ) -> Result<(), RegistryError>
    where
        H: TaskHandler + 'static,
    {
        if self.handlers.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        self.handlers.insert(
            name.to_string(),
            Registration {
                handler: Arc::new(handler),
                policy,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Registration> {
        self.handlers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Noop;

    #[async_trait]
    impl TaskHandler for Noop {
        async fn run(&self, _args: &Value) -> Result<(), TaskError> {
            Ok(())
        }
    }

    fn ok_handler() -> Noop {
        Noop
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = TaskRegistry::default();
        registry.register("send", ok_handler()).unwrap();

        let err = registry.register("send", ok_handler()).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("send".into()));
    }

    #[test]
    fn per_task_policy_overrides_default() {
        let mut registry = TaskRegistry::default();
        registry.register("a", ok_handler()).unwrap();
        registry
            .register_with_policy("b", ok_handler(), RetryPolicy::single_attempt())
            .unwrap();

        assert_eq!(registry.get("a").unwrap().policy.max_attempts, 4);
        assert_eq!(registry.get("b").unwrap().policy.max_attempts, 1);
        assert!(registry.get("c").is_none());
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn fn_handler_receives_args() {
        let handler = handler_fn(|args: Value| async move {
            if args["ok"] == json!(true) {
                Ok(())
            } else {
                Err(TaskError::message("not ok"))
            }
        });

        assert!(handler.run(&json!({"ok": true})).await.is_ok());
        assert!(handler.run(&json!({"ok": false})).await.is_err());
    }
}
