//! Builder API for declaring transitions.
//!
//! Transitions are declared once per (entity type, attribute) and collected
//! into an immutable [`Fsm`](crate::registry::Fsm). Declaration problems
//! such as a missing target are reported by `build()` as a [`BuildError`],
//! never at invocation time.

pub mod error;
pub mod machine;
pub mod macros;
pub mod transition;

pub use error::BuildError;
pub use machine::FsmBuilder;
pub use transition::TransitionBuilder;
