//! # statetab-core
//!
//! Table-driven state machine core for statetab.
//!
//! This crate provides:
//! - The declarative description format and its JSON/YAML loaders
//! - The capability registry that binds guard/action names to closures
//! - Table validation and indexing
//! - Static reachability checks over a built table
//! - The synchronous event dispatcher

pub mod capability;
pub mod definition;
pub mod dispatcher;
pub mod error;
pub mod table;
pub mod token;
pub mod verify;

pub use capability::{ActionList, Callable, Capabilities, CapabilityRole};
pub use definition::{FsmDescription, StateDescription, TransitionDescription};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{LoadError, ValidationError};
pub use table::{StateEntry, StateName, Table, TransitionEntry};
pub use token::{EventKey, StateKey, Target};
pub use verify::{VerifyIssue, VerifyWarning};
