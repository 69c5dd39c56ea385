//! Snapshot and restore of governed fields.
//!
//! A [`FieldSnapshot`] captures the state value of one field together with
//! its protection flag, its last-loaded value and its transition log, so a
//! long-lived entity can be written out and picked up again after a
//! process restart. Declarations (guards, bodies, listeners) are code and
//! are never part of a snapshot; restore into an entity whose registry is
//! already built.
//!
//! # Example
//!
//! ```rust
//! use statewarden::core::FsmField;
//! use statewarden::snapshot::FieldSnapshot;
//!
//! let field: FsmField<String> = FsmField::protected("draft");
//! let json = field.snapshot().unwrap().to_json().unwrap();
//!
//! let restored: FsmField<String> = FsmField::restore(FieldSnapshot::from_json(&json).unwrap()).unwrap();
//! assert_eq!(restored.get(), "draft");
//! assert!(restored.is_protected());
//! ```

use crate::core::{FsmField, State, TransitionLog};
use crate::registry::Fsm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable image of an [`FsmField`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct FieldSnapshot<S: State> {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: Uuid,

    pub taken_at: DateTime<Utc>,

    /// State value at the time of the snapshot
    pub state: S,

    /// Value seen at the last load or commit, kept for drift detection
    pub last_loaded: Option<S>,

    pub protected: bool,

    /// Recorded transitions, empty unless history recording is enabled
    pub history: TransitionLog<S>,
}

impl<S: State> FieldSnapshot<S> {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))
    }

    /// Compact binary encoding.
    pub fn to_binary(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, SnapshotError> {
        bincode::deserialize(bytes).map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))
    }

    fn check_version(&self) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }
}

impl<S: State> FsmField<S> {
    /// Capture the field.
    ///
    /// Fails while a transition body is running: the value is about to
    /// change and the image would be stale.
    pub fn snapshot(&self) -> Result<FieldSnapshot<S>, SnapshotError> {
        if self.in_transition() {
            return Err(SnapshotError::ValidationFailed(format!(
                "state '{}' is mid-transition",
                self.get().name()
            )));
        }

        Ok(FieldSnapshot {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4(),
            taken_at: Utc::now(),
            state: self.get().clone(),
            last_loaded: self.last_loaded().cloned(),
            protected: self.is_protected(),
            history: self.history().clone(),
        })
    }

    /// Rebuild a field from a snapshot.
    pub fn restore(snapshot: FieldSnapshot<S>) -> Result<Self, SnapshotError> {
        snapshot.check_version()?;
        Ok(Self::from_parts(
            snapshot.state,
            snapshot.protected,
            snapshot.last_loaded,
            snapshot.history,
        ))
    }
}

impl<E: 'static, S: State, U> Fsm<E, S, U> {
    /// Snapshot the governed field of `entity`.
    pub fn snapshot(&self, entity: &E) -> Result<FieldSnapshot<S>, SnapshotError> {
        self.field(entity).snapshot()
    }

    /// Replace the governed field of `entity` with a restored one.
    ///
    /// Bypasses protection like a load from the store does.
    pub fn restore(&self, entity: &mut E, snapshot: FieldSnapshot<S>) -> Result<(), SnapshotError> {
        let field = FsmField::restore(snapshot)?;
        tracing::debug!(
            owner = self.owner(),
            attribute = self.attribute(),
            state = %field.get().name(),
            "state restored from snapshot"
        );
        *self.field_mut(entity) = field;
        Ok(())
    }
}
