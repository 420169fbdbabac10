//! Declarative machine descriptions.
//!
//! Descriptions are plain data and can be written in code or loaded from JSON
//! or YAML:
//!
//! ```json
//! {
//!   "initialState": "IDLE",
//!   "states": [
//!     {"name": "IDLE", "entryActions": ["logEnter"], "transitions": [
//!       {"event": "GO", "target": "RUNNING", "actions": ["noop"]}
//!     ]},
//!     {"name": "RUNNING", "entryActions": ["logEnter"], "exitActions": ["logExit"], "transitions": [
//!       {"event": "STOP", "target": "IDLE"}
//!     ]}
//!   ]
//! }
//! ```
//!
//! A description is only data; [`crate::Table::build`] validates it and
//! resolves its names against a [`crate::Capabilities`] registry.

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top level description of a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsmDescription {
    /// State the machine starts in.
    pub initial_state: String,

    /// All states, including the optional `STATE_ANY` pseudo-state.
    pub states: Vec<StateDescription>,
}

/// A state and the transitions leaving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDescription {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_actions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_actions: Option<Vec<String>>,

    /// Transitions in declaration order.
    #[serde(default)]
    pub transitions: Vec<TransitionDescription>,
}

/// A transition out of a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionDescription {
    pub event: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guards: Option<Vec<String>>,

    /// Target state name or `STATE_SAME`.
    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
}

impl FsmDescription {
    pub fn new(initial_state: impl Into<String>) -> Self {
        Self {
            initial_state: initial_state.into(),
            states: Vec::new(),
        }
    }

    /// Appends a state.
    pub fn state(mut self, state: StateDescription) -> Self {
        self.states.push(state);
        self
    }

    /// Parses a description from a JSON value.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, LoadError> {
        Ok(serde_json::from_value(json.clone())?)
    }

    /// Parses a description from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Parses a description from YAML text.
    pub fn from_yaml_str(s: &str) -> Result<Self, LoadError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Reads a description file; `.yaml`/`.yml` files are parsed as YAML,
    /// anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if is_yaml_path(path) {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Returns the description as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, LoadError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Returns true if the path has a YAML extension.
pub fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

impl StateDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_actions: None,
            exit_actions: None,
            transitions: Vec::new(),
        }
    }

    pub fn entry<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry_actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    pub fn exit<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exit_actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    /// Appends a transition.
    pub fn on(mut self, transition: TransitionDescription) -> Self {
        self.transitions.push(transition);
        self
    }
}

impl TransitionDescription {
    pub fn new(event: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            guards: None,
            target: target.into(),
            actions: None,
        }
    }

    pub fn guards<I, S>(mut self, guards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.guards = Some(guards.into_iter().map(Into::into).collect());
        self
    }

    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_definition() -> serde_json::Value {
        serde_json::json!({
            "initialState": "IDLE",
            "states": [
                {"name": "IDLE", "entryActions": ["logEnter"], "transitions": [
                    {"event": "GO", "target": "RUNNING", "actions": ["noop"]}
                ]},
                {"name": "RUNNING", "entryActions": ["logEnter"], "exitActions": ["logExit"],
                 "transitions": [
                    {"event": "STOP", "guards": null, "target": "IDLE"}
                ]}
            ]
        })
    }

    #[test]
    fn test_parse_description() {
        let desc = FsmDescription::from_json(&sample_definition()).unwrap();

        assert_eq!(desc.initial_state, "IDLE");
        assert_eq!(desc.states.len(), 2);
        assert_eq!(desc.states[0].transitions[0].event, "GO");
        assert_eq!(
            desc.states[1].exit_actions,
            Some(vec!["logExit".to_string()])
        );
        assert_eq!(desc.states[1].transitions[0].guards, None);
    }

    #[test]
    fn test_builder_matches_json() {
        let built = FsmDescription::new("IDLE")
            .state(
                StateDescription::new("IDLE")
                    .entry(["logEnter"])
                    .on(TransitionDescription::new("GO", "RUNNING").actions(["noop"])),
            )
            .state(
                StateDescription::new("RUNNING")
                    .entry(["logEnter"])
                    .exit(["logExit"])
                    .on(TransitionDescription::new("STOP", "IDLE")),
            );

        assert_eq!(built, FsmDescription::from_json(&sample_definition()).unwrap());
    }

    #[test]
    fn test_missing_transitions_default_to_empty() {
        let desc = FsmDescription::from_json_str(
            r#"{"initialState": "A", "states": [{"name": "A"}]}"#,
        )
        .unwrap();
        assert!(desc.states[0].transitions.is_empty());
        assert!(desc.states[0].entry_actions.is_none());
    }

    #[test]
    fn test_yaml_description() {
        let yaml = r#"
initialState: IDLE
states:
  - name: IDLE
    transitions:
      - event: GO
        guards: [ready]
        target: STATE_SAME
"#;
        let desc = FsmDescription::from_yaml_str(yaml).unwrap();
        assert_eq!(desc.states[0].transitions[0].target, "STATE_SAME");
        assert_eq!(
            desc.states[0].transitions[0].guards,
            Some(vec!["ready".to_string()])
        );
    }

    #[test]
    fn test_load_picks_format_by_extension() {
        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(json, "{}", sample_definition()).unwrap();
        let from_json = FsmDescription::load(json.path()).unwrap();

        let mut yaml = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        write!(yaml, "{}", serde_yaml::to_string(&from_json).unwrap()).unwrap();
        let from_yaml = FsmDescription::load(yaml.path()).unwrap();

        assert_eq!(from_json, from_yaml);
    }

    #[test]
    fn test_load_missing_file() {
        let result = FsmDescription::load("/nonexistent/statetab.json");
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_malformed_json() {
        let result = FsmDescription::from_json_str(r#"{"states": []}"#);
        assert!(matches!(result, Err(LoadError::Json(_))));
    }
}
