//! Transition registry for one governed attribute.
//!
//! An [`Fsm`] holds every transition declared against one state attribute
//! of one entity type, in declaration order. It is built once by
//! [`FsmBuilder`](crate::builder::FsmBuilder) and is read-only afterwards,
//! which makes it safe to share between threads and to keep in a
//! process-wide `OnceLock` next to the owning type:
//!
//! ```rust
//! use statewarden::builder::FsmBuilder;
//! use statewarden::core::FsmField;
//! use statewarden::registry::Fsm;
//! use std::sync::OnceLock;
//!
//! struct Post {
//!     state: FsmField<String>,
//! }
//!
//! impl Post {
//!     fn state_fsm() -> &'static Fsm<Post, String> {
//!         static FSM: OnceLock<Fsm<Post, String>> = OnceLock::new();
//!         FSM.get_or_init(|| {
//!             FsmBuilder::new("state", |p: &Post| &p.state, |p: &mut Post| &mut p.state)
//!                 .transition("publish", |t| t.from("new").to("published"))
//!                 .build()
//!                 .expect("valid post transitions")
//!         })
//!     }
//! }
//!
//! let post = Post { state: FsmField::new("new") };
//! let names: Vec<&str> = Post::state_fsm()
//!     .available_transitions(&post)
//!     .iter()
//!     .map(|t| t.name())
//!     .collect();
//! assert_eq!(names, vec!["publish"]);
//! ```

mod descriptor;

pub use descriptor::{SourceSummary, TransitionDescriptor, TransitionSummary};

use crate::core::{Actor, FsmField, State};
use crate::executor::TransitionListener;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared accessor for the governed field.
pub type FieldRef<E, S> = fn(&E) -> &FsmField<S>;

/// Mutable accessor for the governed field.
pub type FieldMut<E, S> = fn(&mut E) -> &mut FsmField<S>;

/// Registry of the transitions declared for one (owner type, attribute).
pub struct Fsm<E, S: State, U = ()> {
    pub(crate) owner: &'static str,
    pub(crate) attribute: String,
    pub(crate) field: FieldRef<E, S>,
    pub(crate) field_mut: FieldMut<E, S>,
    pub(crate) transitions: Vec<TransitionDescriptor<E, S, U>>,
    pub(crate) by_operation: HashMap<String, Vec<usize>>,
    pub(crate) listeners: Vec<Arc<dyn TransitionListener<E, S>>>,
    pub(crate) record_history: bool,
}

impl<E: 'static, S: State, U> Fsm<E, S, U> {
    /// Type name of the entity owning the attribute.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn field<'e>(&self, entity: &'e E) -> &'e FsmField<S> {
        (self.field)(entity)
    }

    /// Current state value of `entity`.
    pub fn state<'e>(&self, entity: &'e E) -> &'e S {
        (self.field)(entity).get()
    }

    pub fn records_history(&self) -> bool {
        self.record_history
    }

    /// Every declared transition, in declaration order, regardless of the
    /// current state of any entity.
    pub fn all_transitions(&self) -> &[TransitionDescriptor<E, S, U>] {
        &self.transitions
    }

    /// Descriptors declared for `operation`, in declaration order.
    pub fn transitions_named<'a>(
        &'a self,
        operation: &str,
    ) -> impl Iterator<Item = &'a TransitionDescriptor<E, S, U>> + 'a {
        self.by_operation
            .get(operation)
            .into_iter()
            .flatten()
            .map(move |&index| &self.transitions[index])
    }

    pub fn has_operation(&self, operation: &str) -> bool {
        self.by_operation.contains_key(operation)
    }

    /// Transitions whose source set matches the entity's current state.
    ///
    /// Guards are not evaluated here; see [`Fsm::can_proceed`].
    pub fn available_transitions(&self, entity: &E) -> Vec<&TransitionDescriptor<E, S, U>> {
        let current = self.state(entity);
        self.transitions
            .iter()
            .filter(|descriptor| descriptor.matches_source(current))
            .collect()
    }

    /// Summaries of every declared transition.
    pub fn summaries(&self) -> Vec<TransitionSummary> {
        self.transitions.iter().map(TransitionDescriptor::summary).collect()
    }

    /// Whether `operation` could run now.
    ///
    /// With `check_conditions` the guards of the matching descriptors are
    /// evaluated as well (with no call arguments).
    pub fn can_proceed(&self, entity: &E, operation: &str, check_conditions: bool) -> bool {
        let current = self.state(entity);
        self.transitions_named(operation)
            .filter(|descriptor| descriptor.matches_source(current))
            .any(|descriptor| !check_conditions || descriptor.conditions_met(entity, &Value::Null))
    }

    pub(crate) fn field_mut<'e>(&self, entity: &'e mut E) -> &'e mut FsmField<S> {
        (self.field_mut)(entity)
    }
}

impl<E: 'static, S: State, U: Actor> Fsm<E, S, U> {
    /// Available transitions further filtered by permission. Transitions
    /// without a declared permission are always included.
    pub fn available_transitions_for_actor(
        &self,
        entity: &E,
        actor: &U,
    ) -> Vec<&TransitionDescriptor<E, S, U>> {
        self.available_transitions(entity)
            .into_iter()
            .filter(|descriptor| descriptor.has_permission(entity, actor))
            .collect()
    }

    /// Whether `actor` may run `operation` from the current state, with
    /// its conditions met.
    ///
    /// Only the descriptor an invocation would select is consulted: the
    /// first one matching the current state whose guards pass.
    pub fn has_transition_perm(&self, entity: &E, operation: &str, actor: &U) -> bool {
        let current = self.state(entity);
        self.transitions_named(operation)
            .find(|descriptor| {
                descriptor.matches_source(current) && descriptor.conditions_met(entity, &Value::Null)
            })
            .is_some_and(|descriptor| descriptor.has_permission(entity, actor))
    }
}

impl<E, S: State, U> fmt::Debug for Fsm<E, S, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fsm")
            .field("owner", &self.owner)
            .field("attribute", &self.attribute)
            .field("transitions", &self.transitions)
            .field("listeners", &self.listeners.len())
            .field("record_history", &self.record_history)
            .finish()
    }
}
