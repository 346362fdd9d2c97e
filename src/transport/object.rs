use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
    thread,
};

use toml::Value;
use tracing::debug;

use super::{LocalTransport, PropertyChange, PropertyPath};
use crate::{
    Result, global,
    lifecycle::{Entity, EntityId, Identity, Tracked},
};

/// A subject with named properties whose setters drive a [`LocalTransport`].
///
/// Every `set` produces a change notification, even when the new value
/// equals the old one. Notifications leave in the order the writes happened:
/// one thread at a time drains a queue filled under the write lock, so a
/// `set` racing a delivery on another thread may return before its own
/// change has been delivered.
pub struct ObservedObject {
    entity: Entity,
    transport: Arc<LocalTransport>,
    properties: RwLock<HashMap<PropertyPath, Value>>,
    outbox: Mutex<Outbox>,
}

#[derive(Default)]
struct Outbox {
    pending: VecDeque<PropertyChange>,
    draining: bool,
}

/// Hands the outbox back if a sink unwinds mid-drain.
struct DrainGuard<'a> {
    object: &'a ObservedObject,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.object.lock_outbox().draining = false;
        }
    }
}

impl ObservedObject {
    /// Creates an object wired to the process-wide transport.
    pub fn new() -> Self {
        Self::with_transport(Arc::clone(global::transport()))
    }

    /// Creates an object wired to `transport`.
    pub fn with_transport(transport: Arc<LocalTransport>) -> Self {
        Self {
            entity: Entity::new(),
            transport,
            properties: RwLock::new(HashMap::new()),
            outbox: Mutex::new(Outbox::default()),
        }
    }

    /// Identity of this object.
    pub fn id(&self) -> EntityId {
        self.entity.id()
    }

    /// Current value of the property at `path`, if it was ever set.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Sets the property at `path` and notifies the transport.
    ///
    /// # Errors
    /// * `ObserveError::InvalidArgument` - If `path` is not a valid property path
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        let path = PropertyPath::parse(path)?;
        let new_value = value.into();

        {
            let mut properties = self.properties.write().unwrap_or_else(PoisonError::into_inner);
            let old_value = properties.insert(path.clone(), new_value.clone());

            debug!(subject = %self.id(), %path, "property set");

            let mut outbox = self.lock_outbox();
            outbox
                .pending
                .push_back(PropertyChange::new(self.id(), path, old_value, new_value));

            if outbox.draining {
                return Ok(());
            }
            outbox.draining = true;
        }

        self.drain();
        Ok(())
    }

    fn lock_outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn drain(&self) {
        let _guard = DrainGuard { object: self };

        loop {
            let change = {
                let mut outbox = self.lock_outbox();
                match outbox.pending.pop_front() {
                    Some(change) => change,
                    None => {
                        outbox.draining = false;
                        return;
                    }
                }
            };

            self.transport.notify(&change);
        }
    }

    /// The transport this object reports changes to.
    pub fn transport(&self) -> &Arc<LocalTransport> {
        &self.transport
    }
}

impl Default for ObservedObject {
    fn default() -> Self {
        Self::new()
    }
}

impl Identity for ObservedObject {
    fn entity_id(&self) -> EntityId {
        self.entity.id()
    }
}

impl Tracked for ObservedObject {
    fn entity(&self) -> &Entity {
        &self.entity
    }
}

impl fmt::Debug for ObservedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedObject")
            .field("id", &self.entity.id())
            .field(
                "properties",
                &*self.properties.read().unwrap_or_else(PoisonError::into_inner),
            )
            .finish()
    }
}
