//! Synchronous event dispatch.
//!
//! For an event the dispatcher builds the candidate list from the current
//! state's transitions for that event followed by `STATE_ANY`'s, then takes
//! the first candidate whose guards all pass. If that candidate's actions
//! fail partway, the current state's first `EVENT_CATCH` transition replaces
//! it: its actions run unconditionally and its target is used instead. The
//! catch lookup is scoped to the current state, not to the event that failed.
//!
//! Guards and actions are called on the caller's thread. A panicking closure
//! unwinds out of [`Dispatcher::on_event`]; the state is whatever had been
//! reached when it panicked.

use crate::capability::Capabilities;
use crate::definition::FsmDescription;
use crate::error::ValidationError;
use crate::table::{StateEntry, StateName, Table, TransitionEntry};
use crate::token::Target;
use std::sync::Arc;

/// Detailed result of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A transition moved the machine to another state (possibly the same
    /// state by name, which still runs exit and entry actions).
    Transitioned { from: StateName, to: StateName },
    /// A `STATE_SAME` transition completed.
    Remained,
    /// Transition actions failed and the state's catch transition was taken.
    Caught { from: StateName, to: StateName },
    /// Neither the state nor `STATE_ANY` registers the event.
    NoTransition,
    /// Every candidate's guards failed.
    GuardsRejected,
    /// Transition actions failed and the state has no catch transition.
    ActionFailed,
}

impl DispatchOutcome {
    /// Whether the event counts as handled.
    pub fn is_handled(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::Transitioned { .. }
                | DispatchOutcome::Remained
                | DispatchOutcome::Caught { .. }
        )
    }
}

/// A running machine: a shared table plus this instance's current state.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: Arc<Table>,
    current: StateName,
    previous: Option<StateName>,
    started: bool,
    label: String,
}

impl Dispatcher {
    /// Validates `description` against `capabilities` and creates a machine
    /// in the initial state.
    pub fn new(
        description: FsmDescription,
        capabilities: &Capabilities,
    ) -> Result<Self, ValidationError> {
        let table = Table::build(description, capabilities)?;
        Ok(Self::from_table(Arc::new(table)))
    }

    /// Creates a machine over an already built table.
    pub fn from_table(table: Arc<Table>) -> Self {
        Self {
            current: table.initial().clone(),
            table,
            previous: None,
            started: false,
            label: "FSM".to_string(),
        }
    }

    /// Sets the label attached to this machine's log events.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn current_state(&self) -> &StateName {
        &self.current
    }

    /// The state most recently exited, if any.
    pub fn previous_state(&self) -> Option<&StateName> {
        self.previous.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Runs the initial state's entry actions.
    ///
    /// Only the first call has an effect.
    pub fn start(&mut self) {
        if self.started {
            tracing::warn!(fsm = %self.label, "start called twice; ignoring");
            return;
        }
        self.started = true;
        tracing::debug!(fsm = %self.label, state = %self.current, "starting");

        let table = Arc::clone(&self.table);
        if let Some(state) = table.state(&self.current) {
            state.entry_actions().run_all();
        }
    }

    /// Dispatches an event, returning whether it was handled.
    pub fn on_event(&mut self, event: &str) -> bool {
        self.dispatch(event).is_handled()
    }

    /// Dispatches an event, returning the detailed outcome.
    pub fn dispatch(&mut self, event: &str) -> DispatchOutcome {
        if !self.started {
            tracing::warn!(fsm = %self.label, event, "event dispatched before start");
        }
        tracing::debug!(fsm = %self.label, event, state = %self.current, "event seen");

        let table = Arc::clone(&self.table);
        let Some(state) = table.state(&self.current) else {
            // Unreachable for tables built through Table::build.
            tracing::error!(fsm = %self.label, state = %self.current, "current state missing from table");
            return DispatchOutcome::NoTransition;
        };

        let own = state.transitions_for(event);
        let wildcard = table
            .any()
            .map(|any| any.transitions_for(event))
            .unwrap_or_default();
        if own.is_empty() && wildcard.is_empty() {
            tracing::debug!(fsm = %self.label, event, state = %self.current, "event not handled");
            return DispatchOutcome::NoTransition;
        }

        for transition in own.iter().chain(wildcard) {
            if !transition.guards.run_conditional() {
                tracing::debug!(fsm = %self.label, event, state = %self.current, "conditions not met");
                continue;
            }

            tracing::debug!(fsm = %self.label, event, state = %self.current, "event handled");
            if transition.actions.run_conditional() {
                return self.complete(&table, state, transition, false);
            }

            tracing::debug!(fsm = %self.label, event, state = %self.current, "transition actions returned false");
            return match state.catch() {
                Some(catch) => {
                    tracing::debug!(fsm = %self.label, target = %catch.target, "performing catch transition");
                    catch.actions.run_all();
                    self.complete(&table, state, catch, true)
                }
                None => {
                    tracing::debug!(fsm = %self.label, state = %self.current, "no catch transition; remaining");
                    DispatchOutcome::ActionFailed
                }
            };
        }

        tracing::debug!(fsm = %self.label, event, state = %self.current, "no conditions met");
        DispatchOutcome::GuardsRejected
    }

    /// Applies the active transition's target.
    fn complete(
        &mut self,
        table: &Table,
        state: &StateEntry,
        transition: &TransitionEntry,
        caught: bool,
    ) -> DispatchOutcome {
        let next = match &transition.target {
            Target::Same => {
                tracing::debug!(fsm = %self.label, state = %self.current, "remaining in state");
                return if caught {
                    DispatchOutcome::Caught {
                        from: self.current.clone(),
                        to: self.current.clone(),
                    }
                } else {
                    DispatchOutcome::Remained
                };
            }
            Target::State(next) => next,
        };

        state.exit_actions().run_all();
        let from = std::mem::replace(&mut self.current, next.clone());
        self.previous = Some(from.clone());
        tracing::debug!(fsm = %self.label, from = %from, to = %self.current, "transitioning");
        if let Some(entered) = table.state(&self.current) {
            entered.entry_actions().run_all();
        }

        let to = self.current.clone();
        if caught {
            DispatchOutcome::Caught { from, to }
        } else {
            DispatchOutcome::Transitioned { from, to }
        }
    }
}
