//! Transition log.
//!
//! Records every transition that changed a field's state, in the order it
//! happened. Recording is opt-in per attribute.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a recorded transition ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The body returned normally and the target was committed.
    Completed,
    /// The body failed and the state was redirected to the error target.
    Redirected,
}

/// Record of a single state change.
///
/// # Example
///
/// ```rust
/// use statewarden::core::{Outcome, TransitionRecord};
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     operation: "publish".to_string(),
///     from: "new".to_string(),
///     to: "published".to_string(),
///     outcome: Outcome::Completed,
///     timestamp: Utc::now(),
/// };
/// assert_eq!(record.operation, "publish");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TransitionRecord<S: State> {
    /// The operation that ran
    pub operation: String,
    /// The state before the operation
    pub from: S,
    /// The state after the operation
    pub to: S,
    /// Whether the target or the error target was committed
    pub outcome: Outcome,
    /// When the state changed
    pub timestamp: DateTime<Utc>,
}

/// Ordered log of state changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TransitionLog<S: State> {
    transitions: Vec<TransitionRecord<S>>,
}

impl<S: State> Default for TransitionLog<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> TransitionLog<S> {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, record: TransitionRecord<S>) {
        self.transitions.push(record);
    }

    /// Get the path of states traversed.
    ///
    /// Returns the `from` state of the first record followed by the `to`
    /// state of every record.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the first and last recorded change.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn last(&self) -> Option<&TransitionRecord<S>> {
        self.transitions.last()
    }

    pub fn transitions(&self) -> &[TransitionRecord<S>] {
        &self.transitions
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }
}
