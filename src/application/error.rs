use std::error::Error as StdError;

use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError, tasks::RegistryError};

/// Flattened error chain for reporting.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

/// Errors that end the `dailyblog` binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error("task registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl AppError {
    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_walks_the_source_chain() {
        let err = AppError::from(InfraError::Io(std::io::Error::other("disk gone")));
        let report = err.report();

        assert_eq!(report.messages[0], "io error: disk gone");
        assert!(report.messages.len() >= 2);
    }

    #[test]
    fn duplicate_registration_reads_as_registry_error() {
        let err = AppError::from(RegistryError::AlreadyRegistered("send".into()));
        assert_eq!(
            err.to_string(),
            "task registry error: handler for task `send` is already registered"
        );
    }
}
