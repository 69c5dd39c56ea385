//! Transition notifications.

use crate::core::State;

/// Which side of a transition a notification announces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Sent after guards and permission passed, before the body runs.
    Pre,
    /// Sent after the target state was committed.
    Post,
}

/// A transition boundary notification.
#[derive(Debug)]
pub struct TransitionEvent<'a, E, S: State> {
    pub kind: EventKind,
    pub entity: &'a E,
    pub owner: &'static str,
    pub attribute: &'a str,
    pub operation: &'a str,
    pub source: &'a S,
    /// `None` only for the pre-notification of a computed target.
    pub target: Option<&'a S>,
}

/// Receiver of transition notifications.
///
/// Listeners run synchronously on the invoking thread, in registration
/// order. Post-notifications are never sent for a body that failed.
pub trait TransitionListener<E, S: State>: Send + Sync {
    fn on_transition(&self, event: &TransitionEvent<'_, E, S>);
}

impl<E, S, F> TransitionListener<E, S> for F
where
    S: State,
    F: Fn(&TransitionEvent<'_, E, S>) + Send + Sync,
{
    fn on_transition(&self, event: &TransitionEvent<'_, E, S>) {
        self(event)
    }
}
