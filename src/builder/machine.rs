//! Builder for the transition registry of one attribute.

use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::core::State;
use crate::executor::TransitionListener;
use crate::registry::{FieldMut, FieldRef, Fsm};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for constructing an [`Fsm`] with a fluent API.
///
/// Declaration errors are collected and reported by [`FsmBuilder::build`],
/// the first one in declaration order winning.
pub struct FsmBuilder<E, S: State, U = ()> {
    attribute: String,
    field: FieldRef<E, S>,
    field_mut: FieldMut<E, S>,
    transitions: Vec<TransitionBuilder<E, S, U>>,
    listeners: Vec<Arc<dyn TransitionListener<E, S>>>,
    record_history: bool,
}

impl<E: 'static, S: State> FsmBuilder<E, S> {
    /// Start declaring transitions for `attribute`, reached through the
    /// given accessors.
    pub fn new(attribute: impl Into<String>, field: FieldRef<E, S>, field_mut: FieldMut<E, S>) -> Self {
        Self::for_actor(attribute, field, field_mut)
    }
}

impl<E: 'static, S: State, U: 'static> FsmBuilder<E, S, U> {
    /// Like [`FsmBuilder::new`], for a registry whose permissions are
    /// checked against actors of type `U`.
    pub fn for_actor(
        attribute: impl Into<String>,
        field: FieldRef<E, S>,
        field_mut: FieldMut<E, S>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            field,
            field_mut,
            transitions: Vec::new(),
            listeners: Vec::new(),
            record_history: false,
        }
    }

    /// Declare a transition of `operation`, configured by `configure`.
    ///
    /// The same operation may be declared several times with different
    /// sources; the first declaration matching at runtime wins.
    pub fn transition<F>(self, operation: impl Into<String>, configure: F) -> Self
    where
        F: FnOnce(TransitionBuilder<E, S, U>) -> TransitionBuilder<E, S, U>,
    {
        let builder = configure(TransitionBuilder::new(operation));
        self.add(builder)
    }

    /// Add a transition declared with a standalone builder.
    pub fn add(mut self, builder: TransitionBuilder<E, S, U>) -> Self {
        self.transitions.push(builder);
        self
    }

    /// Register a listener for pre- and post-transition notifications.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: TransitionListener<E, S> + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Record every state change in the field's transition log.
    pub fn record_history(mut self) -> Self {
        self.record_history = true;
        self
    }

    /// Build the registry.
    pub fn build(self) -> Result<Fsm<E, S, U>, BuildError> {
        if self.transitions.is_empty() {
            return Err(BuildError::NoTransitions {
                attribute: self.attribute,
            });
        }

        let transitions = self
            .transitions
            .into_iter()
            .map(TransitionBuilder::build)
            .collect::<Result<Vec<_>, _>>()?;

        let mut by_operation: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, descriptor) in transitions.iter().enumerate() {
            by_operation
                .entry(descriptor.name().to_string())
                .or_default()
                .push(index);
        }

        Ok(Fsm {
            owner: std::any::type_name::<E>(),
            attribute: self.attribute,
            field: self.field,
            field_mut: self.field_mut,
            transitions,
            by_operation,
            listeners: self.listeners,
            record_history: self.record_history,
        })
    }
}
