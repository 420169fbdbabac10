//! Static reachability checks.
//!
//! A table that passes validation can still contain states that no transition
//! ever enters, or states that can never be left. Neither is an error (a final
//! state is legitimately never left), so findings are reported as warnings.
//!
//! - A state other than the initial one is *never entered* when no
//!   transition targets it. Catch transitions of ordinary states count;
//!   catches registered on `STATE_ANY` never fire and do not.
//! - An entered state is *never exited* when neither its own transitions nor
//!   `STATE_ANY`'s event transitions lead to a different state.

use crate::table::{StateEntry, StateName, Table};
use crate::token::Target;
use std::collections::HashSet;
use std::fmt;

/// Kind of reachability problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyIssue {
    NeverEntered,
    NeverExited,
}

/// A reachability finding for one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyWarning {
    pub state: StateName,
    pub issue: VerifyIssue,
}

impl fmt::Display for VerifyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.issue {
            VerifyIssue::NeverEntered => write!(f, "state '{}' is never entered", self.state),
            VerifyIssue::NeverExited => write!(f, "state '{}' is never exited", self.state),
        }
    }
}

impl Table {
    /// Returns reachability warnings, in state declaration order with all
    /// never-entered findings before never-exited ones.
    pub fn verify(&self) -> Vec<VerifyWarning> {
        let entered: HashSet<&StateName> = self
            .states()
            .flat_map(StateEntry::all_transitions)
            .chain(self.any().into_iter().flat_map(StateEntry::event_transitions))
            .filter_map(|t| match &t.target {
                Target::State(name) => Some(name),
                Target::Same => None,
            })
            .collect();

        let mut warnings = Vec::new();
        for name in self.state_names() {
            if name != self.initial() && !entered.contains(name) {
                warnings.push(VerifyWarning {
                    state: name.clone(),
                    issue: VerifyIssue::NeverEntered,
                });
            }
        }

        for name in self.state_names() {
            let reachable = name == self.initial() || entered.contains(name);
            if reachable && !self.leaves(name) {
                warnings.push(VerifyWarning {
                    state: name.clone(),
                    issue: VerifyIssue::NeverExited,
                });
            }
        }

        for warning in &warnings {
            tracing::warn!(checksum = %self.checksum(), "{}", warning);
        }
        warnings
    }

    fn leaves(&self, name: &StateName) -> bool {
        self.state(name)
            .into_iter()
            .flat_map(StateEntry::all_transitions)
            .chain(self.any().into_iter().flat_map(StateEntry::event_transitions))
            .any(|t| matches!(&t.target, Target::State(to) if to != name))
    }
}
