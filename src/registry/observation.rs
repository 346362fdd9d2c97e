use std::{fmt, sync::Arc, time::Instant};

use crate::{
    lifecycle::{EntityId, EntityRef},
    transport::{PropertyChange, PropertyPath, TransportHandle},
};

/// Callback invoked with each change delivered for an observation.
pub type ObservationCallback = Arc<dyn Fn(&PropertyChange) + Send + Sync>;

/// Identity of an observation: who watches which property of whom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationKey {
    /// The observed subject.
    pub subject: EntityId,
    /// The observing entity.
    pub observer: EntityId,
    /// The observed property.
    pub path: PropertyPath,
}

impl ObservationKey {
    /// Creates a key.
    pub fn new(subject: EntityId, observer: EntityId, path: PropertyPath) -> Self {
        Self {
            subject,
            observer,
            path,
        }
    }

    /// Whether `entity` is either endpoint of this key.
    pub fn involves(&self, entity: EntityId) -> bool {
        self.subject == entity || self.observer == entity
    }
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<-{}:{}", self.subject, self.observer, self.path)
    }
}

/// One active registration paired with its transport handle.
pub(super) struct Observation {
    pub(super) key: ObservationKey,
    pub(super) callback: ObservationCallback,
    pub(super) subject_ref: EntityRef,
    pub(super) observer_ref: EntityRef,
    pub(super) handle: TransportHandle,
}

impl Observation {
    pub(super) fn is_live(&self) -> bool {
        self.subject_ref.is_alive() && self.observer_ref.is_alive()
    }
}

/// A callback panicked while a change was being delivered.
///
/// Reported on the registry's failure channel; delivery to every other
/// observation carries on.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackFailure {
    /// The observation whose callback failed.
    pub key: ObservationKey,
    /// Panic message, if it carried one.
    pub message: String,
    /// When the failure was caught.
    pub timestamp: Instant,
}

impl CallbackFailure {
    pub(super) fn new(key: ObservationKey, message: String) -> Self {
        Self {
            key,
            message,
            timestamp: Instant::now(),
        }
    }
}
