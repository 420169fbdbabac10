//! Runtime error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from [`crate::AsyncRunner`].
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("runner already started")]
    AlreadyRunning,

    #[error("no tokio runtime available to host the worker")]
    NoRuntime,

    #[error("runner was never started")]
    NotStarted,

    #[error("worker stopped before reaching state '{0}'")]
    WorkerStopped(String),

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl RunnerError {
    /// Returns an error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            RunnerError::AlreadyRunning => "ALREADY_RUNNING",
            RunnerError::NoRuntime => "NO_RUNTIME",
            RunnerError::NotStarted => "NOT_STARTED",
            RunnerError::WorkerStopped(_) => "WORKER_STOPPED",
            RunnerError::Worker(_) => "WORKER_FAILED",
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
