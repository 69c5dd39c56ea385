//! Core transition types.
//!
//! This module contains the building blocks shared by the registry and the
//! executor:
//! - State values via the `State` trait
//! - Source sets and targets of declared transitions
//! - Guard and permission predicates
//! - The protected state field and its transition log
//!
//! Nothing in this module performs I/O.

mod field;
mod guard;
mod history;
mod permission;
mod source;
mod state;

pub use field::{FsmField, ProtectedStateError};
pub use guard::Guard;
pub use history::{Outcome, TransitionLog, TransitionRecord};
pub use permission::{Actor, Permission};
pub use source::{Source, Target, TargetResolver};
pub use state::{State, StateKey};
