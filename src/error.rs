//! CLI error types.

use statetab_core::{LoadError, ValidationError};
use statetab_runtime::{ConfigError, RunnerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid state table: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}
