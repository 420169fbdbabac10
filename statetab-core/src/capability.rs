//! Capability registry and action invocation.
//!
//! A collaborator exposes its guards and actions as named zero-argument
//! closures returning `bool`. Names in a description are resolved against the
//! registry once, when the table is built; the table then holds the closures.
//!
//! Resolved lists are run under one of two policies:
//!
//! - [`ActionList::run_all`] calls every closure and ignores the results
//!   (entry, exit and catch actions).
//! - [`ActionList::run_conditional`] stops at the first closure returning
//!   `false` (guards and transition actions).

use crate::error::ValidationError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A resolved guard or action.
pub type Callable = Arc<dyn Fn() -> bool + Send + Sync>;

/// Where a capability name was referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityRole {
    Guard,
    Action,
    EntryAction,
    ExitAction,
}

impl fmt::Display for CapabilityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CapabilityRole::Guard => "guard",
            CapabilityRole::Action => "action",
            CapabilityRole::EntryAction => "entry action",
            CapabilityRole::ExitAction => "exit action",
        };
        f.write_str(s)
    }
}

/// Name-to-closure registry supplied by the collaborator.
#[derive(Clone, Default)]
pub struct Capabilities {
    entries: HashMap<String, Callable>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a capability, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(f));
        self
    }

    /// Builder form of [`Capabilities::register`].
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Callable> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolves an optional list of names into an [`ActionList`].
    ///
    /// `None` and an empty list both resolve to an empty list.
    pub(crate) fn resolve(
        &self,
        names: Option<&[String]>,
        role: CapabilityRole,
        state: &str,
    ) -> Result<ActionList, ValidationError> {
        let mut list = ActionList::default();
        for name in names.unwrap_or_default() {
            let callable = self
                .get(name)
                .ok_or_else(|| ValidationError::UnknownCapability {
                    role,
                    name: name.clone(),
                    state: state.to_string(),
                })?;
            list.names.push(name.clone());
            list.calls.push(Arc::clone(callable));
        }
        Ok(list)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("names", &self.names())
            .finish()
    }
}

/// Ordered list of resolved closures.
#[derive(Clone, Default)]
pub struct ActionList {
    names: Vec<String>,
    calls: Vec<Callable>,
}

impl ActionList {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Names the list was resolved from, in call order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Calls every closure in order, ignoring return values.
    pub fn run_all(&self) {
        for call in &self.calls {
            call();
        }
    }

    /// Calls closures in order until one returns `false`.
    ///
    /// Returns `true` only if every closure returned `true`; an empty list
    /// succeeds.
    pub fn run_conditional(&self) -> bool {
        for (name, call) in self.names.iter().zip(&self.calls) {
            if !call() {
                tracing::trace!(name = %name, "returned false");
                return false;
            }
        }
        true
    }
}

impl fmt::Debug for ActionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording(log: &Arc<Mutex<Vec<&'static str>>>) -> Capabilities {
        let mut caps = Capabilities::new();
        for (name, result) in [("a", true), ("b", false), ("c", true)] {
            let log = Arc::clone(log);
            caps.register(name, move || {
                log.lock().unwrap().push(name);
                result
            });
        }
        caps
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_run_all_ignores_results() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let caps = recording(&log);
        let list = caps
            .resolve(Some(&names(&["a", "b", "c"])), CapabilityRole::EntryAction, "S")
            .unwrap();

        list.run_all();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_run_conditional_short_circuits() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let caps = recording(&log);
        let list = caps
            .resolve(Some(&names(&["a", "b", "c"])), CapabilityRole::Action, "S")
            .unwrap();

        assert!(!list.run_conditional());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_run_conditional_all_true() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let caps = recording(&log);
        let list = caps
            .resolve(Some(&names(&["a", "c"])), CapabilityRole::Guard, "S")
            .unwrap();

        assert!(list.run_conditional());
        assert_eq!(*log.lock().unwrap(), vec!["a", "c"]);
    }

    #[test]
    fn test_empty_and_absent_lists() {
        let caps = Capabilities::new();
        let absent = caps.resolve(None, CapabilityRole::Guard, "S").unwrap();
        let empty = caps.resolve(Some(&[]), CapabilityRole::Guard, "S").unwrap();

        assert!(absent.is_empty());
        assert!(absent.run_conditional());
        assert!(empty.run_conditional());
        absent.run_all();
    }

    #[test]
    fn test_unknown_name_fails() {
        let caps = Capabilities::new().with("known", || true);
        let err = caps
            .resolve(
                Some(&names(&["known", "missing"])),
                CapabilityRole::ExitAction,
                "IDLE",
            )
            .unwrap_err();

        match err {
            ValidationError::UnknownCapability { role, name, state } => {
                assert_eq!(role, CapabilityRole::ExitAction);
                assert_eq!(name, "missing");
                assert_eq!(state, "IDLE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_register_replaces() {
        let mut caps = Capabilities::new();
        caps.register("x", || true).register("x", || false);
        assert_eq!(caps.len(), 1);
        assert!(!(caps.get("x").unwrap())());
    }
}
