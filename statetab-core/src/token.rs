//! Reserved names.
//!
//! Descriptions are plain text, so the four reserved tokens arrive as strings.
//! They are parsed once at build time into the closed enums below; after that
//! the dispatcher never compares names against them.

use crate::table::StateName;
use std::fmt;

/// Pseudo-state whose transitions are tried after the current state's own.
pub const STATE_ANY: &str = "STATE_ANY";
/// Transition target meaning "stay, without exit/entry actions".
pub const STATE_SAME: &str = "STATE_SAME";
/// Event name under which a state registers its fallback transition.
pub const EVENT_CATCH: &str = "EVENT_CATCH";
/// Sentinel event that stops an async runner's worker.
pub const EVENT_EXIT: &str = "EVENT_EXIT";

/// Returns true if `name` is one of the reserved tokens.
pub fn is_reserved(name: &str) -> bool {
    matches!(name, STATE_ANY | STATE_SAME | EVENT_CATCH | EVENT_EXIT)
}

/// Key of a state declared in a description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateKey {
    /// The wildcard pseudo-state.
    Any,
    /// An ordinary state.
    Named(StateName),
}

impl StateKey {
    pub fn parse(name: &str) -> Self {
        if name == STATE_ANY {
            StateKey::Any
        } else {
            StateKey::Named(StateName::from(name))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StateKey::Any => STATE_ANY,
            StateKey::Named(name) => name.as_str(),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Stay in the current state; no exit or entry actions run.
    Same,
    /// Move to the named state.
    State(StateName),
}

impl Target {
    pub fn parse(name: &str) -> Self {
        if name == STATE_SAME {
            Target::Same
        } else {
            Target::State(StateName::from(name))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Target::Same => STATE_SAME,
            Target::State(name) => name.as_str(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event under which a transition is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// The state's fallback for failed transition actions.
    Catch,
    /// The async runner's stop sentinel.
    Exit,
    /// An ordinary event.
    Named(String),
}

impl EventKey {
    pub fn parse(name: &str) -> Self {
        match name {
            EVENT_CATCH => EventKey::Catch,
            EVENT_EXIT => EventKey::Exit,
            other => EventKey::Named(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKey::Catch => EVENT_CATCH,
            EventKey::Exit => EVENT_EXIT,
            EventKey::Named(name) => name,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
