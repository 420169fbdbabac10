//! Runtime configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via STATETAB_CONFIG or --config)
//! 3. Environment variables

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Async runner configuration.
    pub runner: RunnerConfig,
    /// Countdown configuration.
    pub countdown: CountdownConfig,
}

impl Config {
    /// Loads configuration from `path` if given, else from STATETAB_CONFIG if
    /// set, then applies environment variable overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match std::env::var("STATETAB_CONFIG") {
                Ok(path) => Self::from_file(&path)?,
                Err(_) => Self::default(),
            },
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from a variable lookup. Unparseable values are
    /// ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.runner.apply_overrides(&lookup);
        self.countdown.apply_overrides(&lookup);
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.runner.validate()?;
        self.countdown.validate()
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// What the worker does when a guard or action panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The panic ends the worker; `join` reports it.
    #[default]
    Propagate,
    /// The panic is logged, the event counts as unhandled, and the worker
    /// moves on to the next event.
    Isolate,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "propagate" => Ok(FailurePolicy::Propagate),
            "isolate" => Ok(FailurePolicy::Isolate),
            other => Err(ConfigError::Validation(format!(
                "unknown failure policy '{}'",
                other
            ))),
        }
    }
}

/// Async runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum queued events before senders wait.
    pub queue_capacity: usize,
    /// Panic handling in the worker.
    pub failure_policy: FailurePolicy,
    /// Label attached to the runner's log events.
    pub label: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            failure_policy: FailurePolicy::Propagate,
            label: "FSMThreaded".to_string(),
        }
    }
}

impl RunnerConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(capacity) = lookup("STATETAB_QUEUE_CAPACITY") {
            match capacity.parse() {
                Ok(n) => self.queue_capacity = n,
                Err(_) => tracing::warn!(value = %capacity, "ignoring STATETAB_QUEUE_CAPACITY"),
            }
        }

        if let Some(policy) = lookup("STATETAB_FAILURE_POLICY") {
            match policy.parse() {
                Ok(p) => self.failure_policy = p,
                Err(_) => tracing::warn!(value = %policy, "ignoring STATETAB_FAILURE_POLICY"),
            }
        }

        if let Some(label) = lookup("STATETAB_LABEL") {
            if !label.is_empty() {
                self.label = label;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "runner.queue_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Countdown configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountdownConfig {
    /// Tick period in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
        }
    }
}

impl CountdownConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(ms) = lookup("STATETAB_TICK_MS") {
            match ms.parse() {
                Ok(n) => self.tick_interval_ms = n,
                Err(_) => tracing::warn!(value = %ms, "ignoring STATETAB_TICK_MS"),
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "countdown.tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the tick interval as Duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
