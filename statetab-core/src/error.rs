//! Core error types.

use crate::capability::CapabilityRole;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating a description into a table.
///
/// Validation is atomic: the first problem found is returned and no table is
/// produced.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("duplicate state name '{state}'")]
    DuplicateState { state: String },

    #[error("initial state '{state}' not found")]
    UnknownInitialState { state: String },

    #[error("target state '{target}' of '{event}' in state '{state}' not found")]
    UnknownTarget {
        state: String,
        event: String,
        target: String,
    },

    #[error("{role} '{name}' in state '{state}' not found")]
    UnknownCapability {
        role: CapabilityRole,
        name: String,
        state: String,
    },

    #[error("reserved name '{name}' cannot be used as {usage}")]
    ReservedName { name: String, usage: &'static str },

    #[error("empty {usage} name")]
    EmptyName { usage: &'static str },
}

impl ValidationError {
    /// Human readable reason, as carried by the error.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Returns a stable error code for this failure.
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::DuplicateState { .. } => "DUPLICATE_STATE",
            ValidationError::UnknownInitialState { .. } => "UNKNOWN_INITIAL_STATE",
            ValidationError::UnknownTarget { .. } => "UNKNOWN_TARGET",
            ValidationError::UnknownCapability { .. } => "UNKNOWN_CAPABILITY",
            ValidationError::ReservedName { .. } => "RESERVED_NAME",
            ValidationError::EmptyName { .. } => "EMPTY_NAME",
        }
    }
}

/// Errors from reading a description document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
