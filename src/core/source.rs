//! Source sets and targets of declared transitions.

use super::state::State;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The set of states a transition may start from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source<S: State> {
    /// Explicit states, matched by membership.
    States(Vec<S>),
    /// Matches every state.
    Any,
    /// Matches every state except the transition's own target.
    AnyExceptTarget,
}

impl<S: State> Source<S> {
    /// Check whether `current` is a legal starting state.
    ///
    /// `target` is the declared fixed target; it only matters for
    /// [`Source::AnyExceptTarget`], which never matches without one.
    pub fn matches(&self, current: &S, target: Option<&S>) -> bool {
        match self {
            Source::States(states) => states.contains(current),
            Source::Any => true,
            Source::AnyExceptTarget => target.is_some_and(|t| t != current),
        }
    }
}

impl<S: State> From<S> for Source<S> {
    fn from(state: S) -> Self {
        Source::States(vec![state])
    }
}

/// Resolver for targets that depend on the entity or call arguments.
pub type TargetResolver<E, S> = Arc<dyn Fn(&E, &Value) -> S + Send + Sync>;

/// Where a successful transition leaves the state attribute.
pub enum Target<E, S: State> {
    /// A single declared state.
    Fixed(S),
    /// Resolved after the operation body returns; the result must be one
    /// of `allowed`.
    Computed {
        allowed: Vec<S>,
        resolve: TargetResolver<E, S>,
    },
}

impl<E, S: State> Target<E, S> {
    /// The declared target, if it is known before the body runs.
    pub fn fixed(&self) -> Option<&S> {
        match self {
            Target::Fixed(state) => Some(state),
            Target::Computed { .. } => None,
        }
    }

    /// Every state this target can produce.
    pub fn possible(&self) -> &[S] {
        match self {
            Target::Fixed(state) => std::slice::from_ref(state),
            Target::Computed { allowed, .. } => allowed,
        }
    }

    /// Resolve the target for a finished body.
    ///
    /// Returns `Err` with the offending state when a computed target
    /// produces a value outside its allowed set.
    pub fn resolve(&self, entity: &E, args: &Value) -> Result<S, S> {
        match self {
            Target::Fixed(state) => Ok(state.clone()),
            Target::Computed { allowed, resolve } => {
                let state = resolve(entity, args);
                if allowed.contains(&state) {
                    Ok(state)
                } else {
                    Err(state)
                }
            }
        }
    }
}

impl<E, S: State> Clone for Target<E, S> {
    fn clone(&self) -> Self {
        match self {
            Target::Fixed(state) => Target::Fixed(state.clone()),
            Target::Computed { allowed, resolve } => Target::Computed {
                allowed: allowed.clone(),
                resolve: Arc::clone(resolve),
            },
        }
    }
}

impl<E, S: State> fmt::Debug for Target<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Fixed(state) => f.debug_tuple("Fixed").field(state).finish(),
            Target::Computed { allowed, .. } => f
                .debug_struct("Computed")
                .field("allowed", allowed)
                .finish_non_exhaustive(),
        }
    }
}
