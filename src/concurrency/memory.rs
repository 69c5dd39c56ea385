use super::{CommitOutcome, StateStore};
use crate::core::State;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::convert::Infallible;
use std::hash::Hash;

/// In-memory [`StateStore`] with atomic compare-and-write.
///
/// Reference store for tests and demos. The whole map sits behind one
/// lock, so a commit is atomic with respect to every other commit.
#[derive(Debug)]
pub struct MemoryStore<K, S> {
    rows: Mutex<HashMap<K, S>>,
}

impl<K: Eq + Hash, S: Clone> MemoryStore<K, S> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    /// Seed or overwrite a row without any check.
    pub fn insert(&self, id: K, state: S) {
        self.rows.lock().insert(id, state);
    }

    pub fn get(&self, id: &K) -> Option<S> {
        self.rows.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

impl<K: Eq + Hash, S: Clone> Default for MemoryStore<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> StateStore<K, S> for MemoryStore<K, S>
where
    K: Eq + Hash + Clone,
    S: State,
{
    type Error = Infallible;

    fn load(&self, id: &K) -> Result<Option<S>, Infallible> {
        Ok(self.get(id))
    }

    fn commit(&self, id: &K, expected: Option<&S>, new: &S) -> Result<CommitOutcome<S>, Infallible> {
        let mut rows = self.rows.lock();
        let persisted = rows.get(id);
        if persisted != expected {
            return Ok(CommitOutcome::Conflict {
                persisted: persisted.cloned(),
            });
        }
        rows.insert(id.clone(), new.clone());
        Ok(CommitOutcome::Committed)
    }
}
