//! Builder for declaring one transition of an operation.

use crate::builder::error::BuildError;
use crate::core::{Guard, Permission, Source, State, Target};
use crate::registry::TransitionDescriptor;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builder for constructing transition descriptors with a fluent API.
///
/// # Example
///
/// ```rust
/// use statewarden::builder::TransitionBuilder;
///
/// struct Post {
///     body: String,
/// }
///
/// let descriptor = TransitionBuilder::<Post, String>::new("publish")
///     .from("new")
///     .from("draft")
///     .to("published")
///     .on_error("failed")
///     .when_named("has_body", |p: &Post| !p.body.is_empty())
///     .build()
///     .unwrap();
///
/// assert_eq!(descriptor.name(), "publish");
/// assert!(descriptor.matches_source(&"draft".to_string()));
/// ```
pub struct TransitionBuilder<E, S: State, U = ()> {
    name: String,
    source: Option<Source<S>>,
    target: Option<Target<E, S>>,
    guards: Vec<Guard<E>>,
    permission: Option<Permission<E, U>>,
    on_error: Option<S>,
    custom: BTreeMap<String, Value>,
}

impl<E: 'static, S: State, U: 'static> TransitionBuilder<E, S, U> {
    /// Create a builder for a transition of `operation`.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            name: operation.into(),
            source: None,
            target: None,
            guards: Vec::new(),
            permission: None,
            on_error: None,
            custom: BTreeMap::new(),
        }
    }

    /// Add a state to the explicit source set.
    ///
    /// Replaces a wildcard source declared earlier.
    pub fn from(mut self, state: impl Into<S>) -> Self {
        let state = state.into();
        match &mut self.source {
            Some(Source::States(states)) => {
                if !states.contains(&state) {
                    states.push(state);
                }
            }
            _ => self.source = Some(Source::States(vec![state])),
        }
        self
    }

    /// Add several states to the explicit source set.
    pub fn from_states<I>(self, states: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<S>,
    {
        let builder = match self.source {
            Some(Source::States(_)) => self,
            _ => self.source(Source::States(Vec::new())),
        };
        states.into_iter().fold(builder, |builder, state| builder.from(state))
    }

    /// Allow the transition from every state.
    pub fn from_any(self) -> Self {
        self.source(Source::Any)
    }

    /// Allow the transition from every state except its target.
    pub fn from_any_except_target(self) -> Self {
        self.source(Source::AnyExceptTarget)
    }

    pub fn source(mut self, source: Source<S>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the target state (required unless computed).
    pub fn to(mut self, state: impl Into<S>) -> Self {
        self.target = Some(Target::Fixed(state.into()));
        self
    }

    /// Compute the target after the body returns.
    ///
    /// The resolver sees the entity and the call arguments; its result
    /// must be one of `allowed`. A result outside `allowed` fails the
    /// invocation like a failed body and follows `on_error` if declared.
    pub fn to_computed<I, F>(mut self, allowed: I, resolve: F) -> Self
    where
        I: IntoIterator,
        I::Item: Into<S>,
        F: Fn(&E, &Value) -> S + Send + Sync + 'static,
    {
        self.target = Some(Target::Computed {
            allowed: allowed.into_iter().map(Into::into).collect(),
            resolve: Arc::new(resolve),
        });
        self
    }

    /// State to move to when the body fails.
    pub fn on_error(mut self, state: impl Into<S>) -> Self {
        self.on_error = Some(state.into());
        self
    }

    /// Add an unnamed guard. It is reported as `condition #<n>`.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::named("", predicate))
    }

    pub fn when_named<F>(self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::named(name, predicate))
    }

    /// Add a guard that also inspects the call arguments.
    pub fn when_args<F>(self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&E, &Value) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::with_args(name, predicate))
    }

    pub fn guard(mut self, guard: Guard<E>) -> Self {
        let guard = if guard.name().is_empty() {
            let label = format!("condition #{}", self.guards.len() + 1);
            guard.rename(label)
        } else {
            guard
        };
        self.guards.push(guard);
        self
    }

    /// Require a named grant from the actor.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(Permission::Named(permission.into()));
        self
    }

    /// Require an arbitrary predicate over the entity and the actor.
    pub fn permission_fn<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E, &U) -> bool + Send + Sync + 'static,
    {
        self.permission = Some(Permission::Predicate(Arc::new(predicate)));
        self
    }

    /// Attach free-form metadata, e.g. a label for UI layers.
    pub fn custom(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Build the descriptor, validating the declaration.
    pub fn build(self) -> Result<TransitionDescriptor<E, S, U>, BuildError> {
        if self.name.is_empty() {
            return Err(BuildError::EmptyOperationName);
        }
        let operation = self.name.clone();

        let source = self.source.ok_or_else(|| BuildError::MissingSource {
            operation: operation.clone(),
        })?;
        if matches!(&source, Source::States(states) if states.is_empty()) {
            return Err(BuildError::EmptySourceSet { operation });
        }

        let target = self.target.ok_or_else(|| BuildError::MissingTarget {
            operation: operation.clone(),
        })?;
        if let Target::Computed { allowed, .. } = &target {
            if allowed.is_empty() {
                return Err(BuildError::EmptyAllowedTargets { operation });
            }
        }
        if matches!(source, Source::AnyExceptTarget) && target.fixed().is_none() {
            return Err(BuildError::ExceptTargetRequiresFixedTarget { operation });
        }

        Ok(TransitionDescriptor {
            name: self.name,
            source,
            target,
            guards: self.guards,
            permission: self.permission,
            on_error: self.on_error,
            custom: self.custom,
        })
    }
}
