//! Description files with scripted capabilities.
//!
//! The CLI has no collaborator object to resolve guard and action names
//! against, so a description file may declare them itself:
//!
//! ```yaml
//! initialState: IDLE
//! capabilities:
//!   ready: true
//!   noop: true
//!   flaky: false
//! states:
//!   - name: IDLE
//!     transitions:
//!       - { event: GO, guards: [ready], target: RUNNING, actions: [noop] }
//! ```
//!
//! Each listed name becomes a capability that returns its constant and
//! records the call.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use statetab_core::definition::is_yaml_path;
use statetab_core::{Capabilities, FsmDescription, LoadError};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// A description plus the constant results of its capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedFile {
    #[serde(flatten)]
    pub description: FsmDescription,

    #[serde(default)]
    pub capabilities: BTreeMap<String, bool>,
}

impl ScriptedFile {
    /// Reads a JSON or YAML file, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if is_yaml_path(path) {
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(serde_json::from_str(&content)?)
        }
    }

    /// Builds the capability registry. Every invocation is appended to
    /// `calls`.
    pub fn capabilities(&self, calls: &CallLog) -> Capabilities {
        let mut caps = Capabilities::new();
        for (name, &result) in &self.capabilities {
            let calls = calls.clone();
            let owned = name.clone();
            caps.register(name.as_str(), move || {
                tracing::debug!(capability = %owned, result, "scripted capability invoked");
                calls.push(&owned);
                result
            });
        }
        caps
    }
}

/// Shared record of scripted capability calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, name: &str) {
        self.0.lock().push(name.to_string());
    }

    /// Returns and clears the recorded calls.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
initialState: IDLE
capabilities:
  ready: true
  flaky: false
states:
  - name: IDLE
    transitions:
      - event: GO
        guards: [ready]
        target: STATE_SAME
        actions: [flaky]
"#;

    #[test]
    fn test_load_yaml_with_capabilities() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let scripted = ScriptedFile::load(file.path()).unwrap();
        assert_eq!(scripted.description.initial_state, "IDLE");
        assert_eq!(scripted.capabilities.get("flaky"), Some(&false));
    }

    #[test]
    fn test_capabilities_are_optional() {
        let scripted: ScriptedFile = serde_json::from_str(
            r#"{"initialState": "A", "states": [{"name": "A"}]}"#,
        )
        .unwrap();
        assert!(scripted.capabilities.is_empty());
    }

    #[test]
    fn test_scripted_results_and_log() {
        let scripted: ScriptedFile = serde_yaml::from_str(YAML).unwrap();
        let calls = CallLog::default();
        let caps = scripted.capabilities(&calls);

        assert!((caps.get("ready").unwrap())());
        assert!(!(caps.get("flaky").unwrap())());
        assert_eq!(calls.take(), vec!["ready", "flaky"]);
        assert!(calls.take().is_empty());
    }
}
