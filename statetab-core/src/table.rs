//! Validated, indexed state tables.

use crate::capability::{ActionList, Capabilities, CapabilityRole};
use crate::definition::{FsmDescription, StateDescription, TransitionDescription};
use crate::error::ValidationError;
use crate::token::{self, EventKey, StateKey, Target};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Name of an ordinary state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateName(pub String);

impl StateName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StateName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StateName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for StateName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StateName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A resolved transition.
#[derive(Debug, Clone)]
pub struct TransitionEntry {
    pub guards: ActionList,
    pub target: Target,
    pub actions: ActionList,
}

/// A resolved state.
#[derive(Debug, Clone)]
pub struct StateEntry {
    key: StateKey,
    entry: ActionList,
    exit: ActionList,
    /// Transitions per event, in declaration order.
    transitions: HashMap<String, Vec<TransitionEntry>>,
    /// `EVENT_CATCH` transitions, in declaration order. Only the first is used.
    catches: Vec<TransitionEntry>,
}

impl StateEntry {
    pub fn key(&self) -> &StateKey {
        &self.key
    }

    pub fn entry_actions(&self) -> &ActionList {
        &self.entry
    }

    pub fn exit_actions(&self) -> &ActionList {
        &self.exit
    }

    /// Transitions registered for `event`, in declaration order.
    pub fn transitions_for(&self, event: &str) -> &[TransitionEntry] {
        self.transitions
            .get(event)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The state's fallback transition, if one is registered.
    pub fn catch(&self) -> Option<&TransitionEntry> {
        self.catches.first()
    }

    /// Events with at least one transition, sorted.
    pub fn events(&self) -> Vec<&str> {
        let mut events: Vec<&str> = self.transitions.keys().map(String::as_str).collect();
        events.sort_unstable();
        events
    }

    /// Transitions keyed by an ordinary event, in no particular order.
    pub fn event_transitions(&self) -> impl Iterator<Item = &TransitionEntry> {
        self.transitions.values().flatten()
    }

    /// All transitions of the state, including catch transitions.
    pub fn all_transitions(&self) -> impl Iterator<Item = &TransitionEntry> {
        self.transitions.values().flatten().chain(&self.catches)
    }
}

/// A validated state table. Immutable once built.
#[derive(Debug, Clone)]
pub struct Table {
    initial: StateName,
    /// Ordinary states in declaration order.
    order: Vec<StateName>,
    states: HashMap<StateName, StateEntry>,
    any: Option<StateEntry>,
    description: FsmDescription,
    checksum: String,
}

impl Table {
    /// Validates a description and resolves its names against `capabilities`.
    pub fn build(
        description: FsmDescription,
        capabilities: &Capabilities,
    ) -> Result<Self, ValidationError> {
        // Collect every state name first so targets can reference states
        // declared later in the list.
        let mut declared: HashSet<&str> = HashSet::new();
        for state in &description.states {
            check_state_name(&state.name)?;
            if !declared.insert(state.name.as_str()) {
                return Err(ValidationError::DuplicateState {
                    state: state.name.clone(),
                });
            }
        }

        if description.initial_state == token::STATE_ANY {
            return Err(ValidationError::ReservedName {
                name: description.initial_state.clone(),
                usage: "initial state",
            });
        }
        if !declared.contains(description.initial_state.as_str()) {
            return Err(ValidationError::UnknownInitialState {
                state: description.initial_state.clone(),
            });
        }

        let mut order = Vec::new();
        let mut states = HashMap::new();
        let mut any = None;
        for state in &description.states {
            let entry = build_state(state, &declared, capabilities)?;
            match entry.key.clone() {
                StateKey::Any => any = Some(entry),
                StateKey::Named(name) => {
                    order.push(name.clone());
                    states.insert(name, entry);
                }
            }
        }

        let checksum = checksum(&description);
        tracing::debug!(
            states = order.len(),
            wildcard = any.is_some(),
            checksum = %checksum,
            "built state table"
        );

        Ok(Self {
            initial: StateName::from(description.initial_state.as_str()),
            order,
            states,
            any,
            description,
            checksum,
        })
    }

    pub fn initial(&self) -> &StateName {
        &self.initial
    }

    /// Looks up an ordinary state.
    pub fn state(&self, name: &StateName) -> Option<&StateEntry> {
        self.states.get(name)
    }

    /// The `STATE_ANY` pseudo-state, if declared.
    pub fn any(&self) -> Option<&StateEntry> {
        self.any.as_ref()
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_key(&StateName::from(name))
    }

    /// Ordinary state names in declaration order.
    pub fn state_names(&self) -> &[StateName] {
        &self.order
    }

    /// Ordinary states in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &StateEntry> {
        self.order.iter().filter_map(|name| self.states.get(name))
    }

    /// Events handled in `state`, including those inherited from `STATE_ANY`.
    pub fn events_from(&self, state: &StateName) -> Vec<&str> {
        let mut events: Vec<&str> = self
            .state(state)
            .into_iter()
            .chain(self.any())
            .flat_map(StateEntry::events)
            .collect();
        events.sort_unstable();
        events.dedup();
        events
    }

    /// The description this table was built from.
    pub fn description(&self) -> &FsmDescription {
        &self.description
    }

    /// CRC32C of the description, as eight hex digits.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

fn check_state_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName { usage: "state" });
    }
    if name != token::STATE_ANY && token::is_reserved(name) {
        return Err(ValidationError::ReservedName {
            name: name.to_string(),
            usage: "state name",
        });
    }
    Ok(())
}

fn build_state(
    state: &StateDescription,
    declared: &HashSet<&str>,
    capabilities: &Capabilities,
) -> Result<StateEntry, ValidationError> {
    let name = state.name.as_str();
    let entry = capabilities.resolve(
        state.entry_actions.as_deref(),
        CapabilityRole::EntryAction,
        name,
    )?;
    let exit = capabilities.resolve(
        state.exit_actions.as_deref(),
        CapabilityRole::ExitAction,
        name,
    )?;

    let mut transitions: HashMap<String, Vec<TransitionEntry>> = HashMap::new();
    let mut catches = Vec::new();
    for t in &state.transitions {
        let resolved = build_transition(name, t, declared, capabilities)?;
        match EventKey::parse(&t.event) {
            EventKey::Catch => catches.push(resolved),
            EventKey::Exit => {
                return Err(ValidationError::ReservedName {
                    name: t.event.clone(),
                    usage: "transition event",
                })
            }
            EventKey::Named(event) => transitions.entry(event).or_default().push(resolved),
        }
    }

    let key = StateKey::parse(name);
    if key == StateKey::Any && !catches.is_empty() {
        tracing::warn!(
            state = name,
            "catch transitions on STATE_ANY are never used; register them on each state"
        );
    }

    Ok(StateEntry {
        key,
        entry,
        exit,
        transitions,
        catches,
    })
}

fn build_transition(
    state: &str,
    t: &TransitionDescription,
    declared: &HashSet<&str>,
    capabilities: &Capabilities,
) -> Result<TransitionEntry, ValidationError> {
    if t.event.is_empty() {
        return Err(ValidationError::EmptyName { usage: "event" });
    }
    if t.target == token::STATE_ANY {
        return Err(ValidationError::ReservedName {
            name: t.target.clone(),
            usage: "transition target",
        });
    }

    let target = Target::parse(&t.target);
    if let Target::State(name) = &target {
        if !declared.contains(name.as_str()) {
            return Err(ValidationError::UnknownTarget {
                state: state.to_string(),
                event: t.event.clone(),
                target: t.target.clone(),
            });
        }
    }

    let guards = capabilities.resolve(t.guards.as_deref(), CapabilityRole::Guard, state)?;
    let actions = capabilities.resolve(t.actions.as_deref(), CapabilityRole::Action, state)?;

    Ok(TransitionEntry {
        guards,
        target,
        actions,
    })
}

/// Checksum over every name in the description, in declaration order.
fn checksum(description: &FsmDescription) -> String {
    fn feed(crc: u32, s: &str) -> u32 {
        // Length prefix keeps ["ab", "c"] and ["a", "bc"] apart.
        let crc = crc32c::crc32c_append(crc, &(s.len() as u64).to_le_bytes());
        crc32c::crc32c_append(crc, s.as_bytes())
    }
    fn feed_list(crc: u32, list: &Option<Vec<String>>) -> u32 {
        match list {
            None => crc32c::crc32c_append(crc, &[0]),
            Some(items) => items
                .iter()
                .fold(crc32c::crc32c_append(crc, &[1]), |crc, s| feed(crc, s)),
        }
    }

    let mut crc = feed(0, &description.initial_state);
    for state in &description.states {
        crc = feed(crc, &state.name);
        crc = feed_list(crc, &state.entry_actions);
        crc = feed_list(crc, &state.exit_actions);
        for t in &state.transitions {
            crc = feed(crc, &t.event);
            crc = feed_list(crc, &t.guards);
            crc = feed(crc, &t.target);
            crc = feed_list(crc, &t.actions);
        }
    }
    format!("{:08x}", crc)
}
