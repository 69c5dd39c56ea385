//! Governed state attribute with optional write protection.
//!
//! A protected field rejects direct assignment unless a transition is in
//! progress on it. Values read back from a store go through
//! [`FsmField::reload_from_store`], which is a fresh read rather than an
//! assignment and is never rejected.

use super::history::{TransitionLog, TransitionRecord};
use super::state::State;
use thiserror::Error;

/// Direct assignment to a protected state attribute outside a transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("direct modification of protected state '{current}' is not allowed (attempted '{attempted}')")]
pub struct ProtectedStateError {
    pub current: String,
    pub attempted: String,
}

/// State attribute governed by a transition registry.
#[derive(Clone, Debug)]
pub struct FsmField<S: State> {
    value: S,
    protected: bool,
    /// Open transitions on this field; nested invocations stack.
    depth: u32,
    last_loaded: Option<S>,
    history: TransitionLog<S>,
}

impl<S: State> FsmField<S> {
    /// Unprotected field: direct writes are allowed.
    pub fn new(initial: impl Into<S>) -> Self {
        Self::with_protection(initial.into(), false)
    }

    /// Protected field: only transitions may change the value.
    pub fn protected(initial: impl Into<S>) -> Self {
        Self::with_protection(initial.into(), true)
    }

    fn with_protection(value: S, protected: bool) -> Self {
        Self {
            value,
            protected,
            depth: 0,
            last_loaded: None,
            history: TransitionLog::new(),
        }
    }

    pub fn get(&self) -> &S {
        &self.value
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Whether a transition body is currently running against this field.
    pub fn in_transition(&self) -> bool {
        self.depth > 0
    }

    /// Assign a new value directly.
    ///
    /// Protected fields reject this unless a transition is in progress.
    pub fn set(&mut self, value: impl Into<S>) -> Result<(), ProtectedStateError> {
        let value = value.into();
        if self.protected && !self.in_transition() {
            return Err(ProtectedStateError {
                current: self.value.name().into_owned(),
                attempted: value.name().into_owned(),
            });
        }
        self.value = value;
        Ok(())
    }

    /// Replace the value with one freshly read from the store.
    ///
    /// Meant for persistence adapters that populate entities themselves;
    /// [`ConcurrencyGuard::load`](crate::concurrency::ConcurrencyGuard::load)
    /// is the usual path. Bypasses protection, records no history and
    /// notifies nobody. The value becomes the last-loaded snapshot used
    /// for drift detection at commit time.
    pub fn reload_from_store(&mut self, value: S) {
        self.load(value);
    }

    pub(crate) fn load(&mut self, value: S) {
        self.last_loaded = Some(value.clone());
        self.value = value;
    }

    /// Value observed at the last load or successful commit.
    ///
    /// `None` for a field that has never been read from or written to a
    /// store.
    pub fn last_loaded(&self) -> Option<&S> {
        self.last_loaded.as_ref()
    }

    /// Whether the in-memory value differs from the last-loaded snapshot.
    pub fn is_dirty(&self) -> bool {
        self.last_loaded.as_ref() != Some(&self.value)
    }

    pub fn history(&self) -> &TransitionLog<S> {
        &self.history
    }

    pub(crate) fn begin_transition(&mut self) {
        self.depth += 1;
    }

    /// Close one level; the field stays open while an outer transition runs.
    pub(crate) fn end_transition(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Executor commit step. Protection never applies here.
    pub(crate) fn commit_state(&mut self, value: S) {
        self.value = value;
    }

    pub(crate) fn record(&mut self, record: TransitionRecord<S>) {
        self.history.push(record);
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.last_loaded = Some(self.value.clone());
    }

    pub(crate) fn from_parts(
        value: S,
        protected: bool,
        last_loaded: Option<S>,
        history: TransitionLog<S>,
    ) -> Self {
        Self {
            value,
            protected,
            depth: 0,
            last_loaded,
            history,
        }
    }
}

impl<S: State> PartialEq<S> for FsmField<S> {
    fn eq(&self, other: &S) -> bool {
        &self.value == other
    }
}
