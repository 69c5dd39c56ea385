//! Transition execution errors.

use std::fmt;
use thiserror::Error;

/// Why a transition was refused before its body ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No transition of that name is declared for the attribute.
    UnknownOperation,
    /// No declared source set contains the current state.
    NoMatchingSource,
    /// Every matching transition had at least one failing guard.
    GuardsFailed { blocked: Vec<String> },
    /// The actor lacks the permission the chosen transition requires.
    PermissionDenied { permission: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnknownOperation => f.write_str("no such transition"),
            Rejection::NoMatchingSource => f.write_str("no transition matches the current state"),
            Rejection::GuardsFailed { blocked } => {
                write!(f, "conditions not met: {}", blocked.join(", "))
            }
            Rejection::PermissionDenied { permission } => {
                write!(f, "permission '{permission}' denied")
            }
        }
    }
}

/// A transition was refused; the state is unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Can't {operation} {owner}.{attribute} from state '{state}': {reason}")]
pub struct TransitionNotAllowed {
    pub owner: &'static str,
    pub attribute: String,
    pub operation: String,
    pub state: String,
    pub reason: Rejection,
}

impl TransitionNotAllowed {
    /// Refused because of guards ("not ready") rather than permission.
    pub fn is_guard_failure(&self) -> bool {
        matches!(self.reason, Rejection::GuardsFailed { .. })
    }

    /// Refused because the actor is not authorized.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.reason, Rejection::PermissionDenied { .. })
    }
}

/// Errors returned by a transition invocation.
///
/// `B` is the error type of the operation body, returned unchanged.
#[derive(Debug, Error)]
pub enum TransitionError<B> {
    #[error(transparent)]
    Rejected(#[from] TransitionNotAllowed),

    #[error("Transition '{operation}' resolved to state '{resolved}', which is not one of {allowed:?}")]
    InvalidResultState {
        operation: String,
        resolved: String,
        allowed: Vec<String>,
    },

    #[error(transparent)]
    Failed(B),
}

impl<B> TransitionError<B> {
    pub fn rejection(&self) -> Option<&TransitionNotAllowed> {
        match self {
            TransitionError::Rejected(rejected) => Some(rejected),
            _ => None,
        }
    }

    /// The body's own error, if the body ran and failed.
    pub fn into_failure(self) -> Option<B> {
        match self {
            TransitionError::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, TransitionError::Rejected(_))
    }
}
