//! Immutable record of one declared transition.

use crate::core::{Actor, Guard, Permission, Source, State, Target};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// One legal source-set to target mapping of an operation, with the
/// conditions, permission and error target that apply to it.
///
/// Built by [`TransitionBuilder`](crate::builder::TransitionBuilder) and
/// owned by an [`Fsm`](crate::registry::Fsm); never mutated afterwards.
pub struct TransitionDescriptor<E, S: State, U = ()> {
    pub(crate) name: String,
    pub(crate) source: Source<S>,
    pub(crate) target: Target<E, S>,
    pub(crate) guards: Vec<Guard<E>>,
    pub(crate) permission: Option<Permission<E, U>>,
    pub(crate) on_error: Option<S>,
    pub(crate) custom: BTreeMap<String, Value>,
}

impl<E: 'static, S: State, U> TransitionDescriptor<E, S, U> {
    /// Operation name this transition belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Source<S> {
        &self.source
    }

    pub fn target(&self) -> &Target<E, S> {
        &self.target
    }

    pub fn guards(&self) -> &[Guard<E>] {
        &self.guards
    }

    pub fn permission(&self) -> Option<&Permission<E, U>> {
        self.permission.as_ref()
    }

    pub fn on_error(&self) -> Option<&S> {
        self.on_error.as_ref()
    }

    /// Free-form metadata attached at declaration time.
    pub fn custom(&self) -> &BTreeMap<String, Value> {
        &self.custom
    }

    /// Whether the transition may start from `current`.
    pub fn matches_source(&self, current: &S) -> bool {
        self.source.matches(current, self.target.fixed())
    }

    /// Evaluate every guard, accumulating the names of all that fail.
    pub fn check_conditions(&self, entity: &E, args: &Value) -> Validation<(), NonEmptyVec<String>> {
        if self.guards.is_empty() {
            return Validation::success(());
        }

        let checks: Vec<Validation<(), NonEmptyVec<String>>> = self
            .guards
            .iter()
            .map(|guard| {
                if guard.check(entity, args) {
                    Validation::success(())
                } else {
                    Validation::fail(guard.name().to_string())
                }
            })
            .collect();

        Validation::all_vec(checks).map(|_| ())
    }

    pub fn conditions_met(&self, entity: &E, args: &Value) -> bool {
        self.check_conditions(entity, args).is_success()
    }

    /// Serializable view for enumeration surfaces.
    pub fn summary(&self) -> TransitionSummary {
        let source = match &self.source {
            Source::States(states) => {
                SourceSummary::States(states.iter().map(|s| s.name().into_owned()).collect())
            }
            Source::Any => SourceSummary::Any,
            Source::AnyExceptTarget => SourceSummary::AnyExceptTarget,
        };

        TransitionSummary {
            name: self.name.clone(),
            source,
            target: self.target.fixed().map(|s| s.name().into_owned()),
            possible_targets: self
                .target
                .possible()
                .iter()
                .map(|s| s.name().into_owned())
                .collect(),
            on_error: self.on_error.as_ref().map(|s| s.name().into_owned()),
            custom: self.custom.clone(),
        }
    }
}

impl<E: 'static, S: State, U: Actor> TransitionDescriptor<E, S, U> {
    /// Whether `actor` may run this transition. No declared permission
    /// means everyone may.
    pub fn has_permission(&self, entity: &E, actor: &U) -> bool {
        self.permission
            .as_ref()
            .map_or(true, |permission| permission.check(entity, actor))
    }
}

impl<E, S: State, U> Clone for TransitionDescriptor<E, S, U> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            guards: self.guards.clone(),
            permission: self.permission.clone(),
            on_error: self.on_error.clone(),
            custom: self.custom.clone(),
        }
    }
}

impl<E, S: State, U> fmt::Debug for TransitionDescriptor<E, S, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionDescriptor")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("guards", &self.guards)
            .field("permission", &self.permission)
            .field("on_error", &self.on_error)
            .field("custom", &self.custom)
            .finish()
    }
}

/// Source set as exposed to UI and API layers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "states", rename_all = "snake_case")]
pub enum SourceSummary {
    States(Vec<String>),
    Any,
    AnyExceptTarget,
}

/// Descriptor summary: `{name, source, target, metadata}` plus the
/// possible targets of a computed transition and its error target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionSummary {
    pub name: String,
    pub source: SourceSummary,
    /// `None` when the target is computed after the body runs.
    pub target: Option<String>,
    pub possible_targets: Vec<String>,
    pub on_error: Option<String>,
    pub custom: BTreeMap<String, Value>,
}
