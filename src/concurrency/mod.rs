//! Optimistic concurrency guard.
//!
//! Detects lost updates when several in-memory copies of the same entity
//! run transitions and persist them. Each copy remembers the state it last
//! loaded; a commit only goes through if the store still holds that state.
//!
//! Two things are assumed from the store and the caller and not enforced
//! here:
//! - [`StateStore::commit`] is an atomic compare-and-write for one
//!   identity
//! - transition bodies have no externally visible effects besides the
//!   persisted write, since a refused commit cannot undo them
//!
//! A refused commit is reported as [`ConcurrentTransition`]; retrying
//! (reload, re-run the transition, commit again) is up to the caller.

mod memory;

pub use memory::MemoryStore;

use crate::core::State;
use crate::registry::Fsm;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

/// Result of an atomic compare-and-write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome<S> {
    Committed,
    /// The stored state was not the expected one; nothing was written.
    Conflict { persisted: Option<S> },
}

/// Persistence collaborator holding the durable state value per identity.
pub trait StateStore<K, S: State> {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the persisted state, `None` if the identity is unknown.
    fn load(&self, id: &K) -> Result<Option<S>, Self::Error>;

    /// Write `new` if the persisted state equals `expected`.
    ///
    /// `expected = None` means the identity must not exist yet.
    fn commit(&self, id: &K, expected: Option<&S>, new: &S) -> Result<CommitOutcome<S>, Self::Error>;
}

impl<K, S: State, T: StateStore<K, S> + ?Sized> StateStore<K, S> for &T {
    type Error = T::Error;

    fn load(&self, id: &K) -> Result<Option<S>, Self::Error> {
        (**self).load(id)
    }

    fn commit(&self, id: &K, expected: Option<&S>, new: &S) -> Result<CommitOutcome<S>, Self::Error> {
        (**self).commit(id, expected, new)
    }
}

impl<K, S: State, T: StateStore<K, S> + ?Sized> StateStore<K, S> for Arc<T> {
    type Error = T::Error;

    fn load(&self, id: &K) -> Result<Option<S>, Self::Error> {
        (**self).load(id)
    }

    fn commit(&self, id: &K, expected: Option<&S>, new: &S) -> Result<CommitOutcome<S>, Self::Error> {
        (**self).commit(id, expected, new)
    }
}

/// The persisted state drifted since this copy loaded it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "Concurrent transition on {owner}.{attribute}: expected persisted state {expected:?}, found {found:?}"
)]
pub struct ConcurrentTransition {
    pub owner: &'static str,
    pub attribute: String,
    /// State observed at load time, `None` for a never-persisted copy.
    pub expected: Option<String>,
    /// State found in the store, `None` if the record is missing.
    pub found: Option<String>,
}

/// Errors from loading or committing through the guard.
#[derive(Debug, Error)]
pub enum CommitError<E> {
    #[error(transparent)]
    Concurrent(#[from] ConcurrentTransition),

    #[error("No persisted state for entity {id}")]
    NotFound { id: String },

    #[error("State store failure: {0}")]
    Store(#[source] E),
}

impl<E> CommitError<E> {
    pub fn is_concurrent(&self) -> bool {
        matches!(self, CommitError::Concurrent(_))
    }
}

/// Compare-and-commit protocol over a [`StateStore`].
#[derive(Debug, Clone)]
pub struct ConcurrencyGuard<St> {
    store: St,
}

impl<St> ConcurrencyGuard<St> {
    pub fn new(store: St) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Read the persisted state into `entity` and snapshot it.
    pub fn load<E, S, U, K>(
        &self,
        fsm: &Fsm<E, S, U>,
        entity: &mut E,
        id: &K,
    ) -> Result<(), CommitError<St::Error>>
    where
        E: 'static,
        S: State,
        K: Debug,
        St: StateStore<K, S>,
    {
        let persisted = self.store.load(id).map_err(CommitError::Store)?;
        let Some(state) = persisted else {
            return Err(CommitError::NotFound {
                id: format!("{id:?}"),
            });
        };

        tracing::trace!(
            owner = fsm.owner(),
            attribute = fsm.attribute(),
            id = ?id,
            state = %state.name(),
            "state loaded"
        );
        fsm.field_mut(entity).load(state);
        Ok(())
    }

    /// Reload after a [`ConcurrentTransition`]; discards in-memory changes
    /// to the state attribute.
    pub fn refresh<E, S, U, K>(
        &self,
        fsm: &Fsm<E, S, U>,
        entity: &mut E,
        id: &K,
    ) -> Result<(), CommitError<St::Error>>
    where
        E: 'static,
        S: State,
        K: Debug,
        St: StateStore<K, S>,
    {
        self.load(fsm, entity, id)
    }

    /// Persist the entity's current state if nobody else changed it since
    /// it was loaded.
    ///
    /// On success the snapshot moves to the committed value. On conflict
    /// nothing is written and the in-memory state is left as is.
    pub fn commit<E, S, U, K>(
        &self,
        fsm: &Fsm<E, S, U>,
        entity: &mut E,
        id: &K,
    ) -> Result<(), CommitError<St::Error>>
    where
        E: 'static,
        S: State,
        K: Debug,
        St: StateStore<K, S>,
    {
        let field = fsm.field(entity);
        let expected = field.last_loaded().cloned();
        let current = field.get().clone();

        let persisted = self.store.load(id).map_err(CommitError::Store)?;
        if persisted != expected {
            return Err(self.conflict(fsm, id, expected.as_ref(), persisted.as_ref()).into());
        }

        match self
            .store
            .commit(id, expected.as_ref(), &current)
            .map_err(CommitError::Store)?
        {
            CommitOutcome::Committed => {
                tracing::debug!(
                    owner = fsm.owner(),
                    attribute = fsm.attribute(),
                    id = ?id,
                    state = %current.name(),
                    "state committed"
                );
                fsm.field_mut(entity).mark_persisted();
                Ok(())
            }
            CommitOutcome::Conflict { persisted } => {
                Err(self.conflict(fsm, id, expected.as_ref(), persisted.as_ref()).into())
            }
        }
    }

    fn conflict<E, S, U, K>(
        &self,
        fsm: &Fsm<E, S, U>,
        id: &K,
        expected: Option<&S>,
        found: Option<&S>,
    ) -> ConcurrentTransition
    where
        E: 'static,
        S: State,
        K: Debug,
    {
        let conflict = ConcurrentTransition {
            owner: fsm.owner(),
            attribute: fsm.attribute().to_string(),
            expected: expected.map(|s| s.name().into_owned()),
            found: found.map(|s| s.name().into_owned()),
        };
        tracing::warn!(
            owner = conflict.owner,
            attribute = %conflict.attribute,
            id = ?id,
            expected = ?conflict.expected,
            found = ?conflict.found,
            "concurrent transition detected, commit refused"
        );
        conflict
    }
}
