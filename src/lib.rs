//! Statewarden: declarative state transitions for plain Rust entities
//!
//! A state attribute of an entity is governed by a registry of declared
//! transitions. Each transition names the states it may start from, the
//! state it leads to, optional guards and a permission, and an error
//! target to fall back to when the operation body fails. Calling an
//! operation checks all of that before the body runs and commits the new
//! state only after it returns.
//!
//! # Core Concepts
//!
//! - **State**: any value type implementing [`State`], or an enum from [`state_enum!`]
//! - **FsmField**: the governed attribute, optionally write-protected
//! - **Fsm**: immutable registry of transitions for one attribute, built once
//! - **Invocation**: a call of an operation with optional arguments and actor
//! - **ConcurrencyGuard**: optimistic lost-update detection on persist
//!
//! # Example
//!
//! ```rust
//! use statewarden::{FsmBuilder, FsmField, TransitionError};
//!
//! struct Post {
//!     title: String,
//!     state: FsmField<String>,
//! }
//!
//! let fsm = FsmBuilder::new("state", |p: &Post| &p.state, |p: &mut Post| &mut p.state)
//!     .transition("publish", |t| {
//!         t.from("new")
//!             .to("published")
//!             .when_named("has_title", |p: &Post| !p.title.is_empty())
//!     })
//!     .transition("remove", |t| t.from("published").to("removed").on_error("failed"))
//!     .build()
//!     .unwrap();
//!
//! let mut post = Post {
//!     title: "Hello".to_string(),
//!     state: FsmField::protected("new"),
//! };
//!
//! // Direct writes to a protected field are refused.
//! assert!(post.state.set("published").is_err());
//!
//! fsm.apply(&mut post, "publish").unwrap();
//! assert_eq!(post.state.get(), "published");
//!
//! // A failing body moves the state to the error target.
//! let result: Result<(), TransitionError<&str>> =
//!     fsm.invoke(&mut post, "remove", |_| Err("storage offline"));
//! assert!(matches!(result, Err(TransitionError::Failed("storage offline"))));
//! assert_eq!(post.state.get(), "failed");
//! ```

pub mod builder;
pub mod concurrency;
pub mod core;
pub mod executor;
pub mod registry;
pub mod snapshot;

// Re-export commonly used types
pub use builder::{BuildError, FsmBuilder, TransitionBuilder};
pub use concurrency::{CommitError, ConcurrencyGuard, ConcurrentTransition, MemoryStore, StateStore};
pub use core::{Actor, FsmField, Guard, ProtectedStateError, Source, State};
pub use executor::{Rejection, TransitionError, TransitionEvent, TransitionNotAllowed};
pub use registry::Fsm;
pub use snapshot::{FieldSnapshot, SnapshotError};
