//! Declaration-time errors.

use thiserror::Error;

/// Errors that can occur when declaring transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Transition name is empty")]
    EmptyOperationName,

    #[error("Transition '{operation}' has no source. Call .from(state), .from_any() or .from_any_except_target()")]
    MissingSource { operation: String },

    #[error("Transition '{operation}' declares an empty source set")]
    EmptySourceSet { operation: String },

    #[error("Transition '{operation}' has no target. Call .to(state) or .to_computed(..)")]
    MissingTarget { operation: String },

    #[error("Transition '{operation}' computes its target but allows no target states")]
    EmptyAllowedTargets { operation: String },

    #[error("Transition '{operation}' uses an any-except-target source, which needs a fixed target")]
    ExceptTargetRequiresFixedTarget { operation: String },

    #[error("No transitions declared for attribute '{attribute}'")]
    NoTransitions { attribute: String },
}
