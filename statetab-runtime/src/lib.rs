//! # statetab-runtime
//!
//! Runs statetab machines off the caller's thread.
//!
//! This crate provides:
//! - [`AsyncRunner`]: a bounded event queue drained by a single worker
//! - [`Countdown`]: a pausable tick counter with a completion callback
//! - [`Config`]: runner and countdown settings from YAML and environment

pub mod config;
pub mod countdown;
pub mod error;
pub mod runner;

pub use config::{Config, CountdownConfig, FailurePolicy, RunnerConfig};
pub use countdown::Countdown;
pub use error::{ConfigError, RunnerError};
pub use runner::{AsyncRunner, RunnerEvent, WorkerReport};
