use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::{trace, warn};

use super::{ChangeSink, PropertyChange, PropertyPath, Transport, TransportError, TransportHandle};
use crate::lifecycle::EntityId;

struct NativeRegistration {
    subject: EntityId,
    path: PropertyPath,
    sink: Weak<dyn ChangeSink>,
}

/// In-process transport with a native registration table.
///
/// Every `register` call creates an independent registration, and
/// `unregister` of a handle that is not active fails. This is exactly the
/// behavior the registry exists to shield callers from.
pub struct LocalTransport {
    registrations: Mutex<BTreeMap<TransportHandle, NativeRegistration>>,
    next_handle: AtomicU64,
}

impl LocalTransport {
    /// Creates a transport with no registrations.
    pub fn new() -> Self {
        Self {
            registrations: Mutex::new(BTreeMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Creates a shared transport.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Total number of active registrations.
    pub fn active_registrations(&self) -> usize {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of active registrations for `path` on `subject`.
    pub fn registrations_for(&self, subject: EntityId, path: &str) -> usize {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|registration| {
                registration.subject == subject && registration.path.as_str() == path
            })
            .count()
    }

    /// Reports `change` to every registration for its subject and path.
    ///
    /// Targets are snapshotted first so no transport lock is held while sinks
    /// run; sinks may register or unregister from inside `deliver`.
    pub fn notify(&self, change: &PropertyChange) {
        let targets: Vec<(TransportHandle, Weak<dyn ChangeSink>)> = {
            let registrations = self
                .registrations
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            registrations
                .iter()
                .filter(|(_, registration)| {
                    registration.subject == change.subject && registration.path == change.path
                })
                .map(|(handle, registration)| (*handle, Weak::clone(&registration.sink)))
                .collect()
        };

        trace!(
            subject = %change.subject,
            path = %change.path,
            targets = targets.len(),
            "notifying registrations"
        );

        for (handle, sink) in targets {
            match sink.upgrade() {
                Some(sink) => sink.deliver(handle, change),
                None => trace!(%handle, "sink dropped, skipping delivery"),
            }
        }
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LocalTransport {
    fn register(
        &self,
        subject: EntityId,
        path: &PropertyPath,
        sink: Weak<dyn ChangeSink>,
    ) -> Result<TransportHandle, TransportError> {
        if sink.strong_count() == 0 {
            return Err(TransportError::SinkUnavailable);
        }

        let handle = TransportHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));

        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                handle,
                NativeRegistration {
                    subject,
                    path: path.clone(),
                    sink,
                },
            );

        trace!(%handle, %subject, %path, "registered");
        Ok(handle)
    }

    fn unregister(&self, handle: TransportHandle) -> Result<(), TransportError> {
        let removed = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);

        match removed {
            Some(_) => {
                trace!(%handle, "unregistered");
                Ok(())
            }
            None => {
                warn!(%handle, "unregister of inactive handle");
                Err(TransportError::UnknownHandle(handle))
            }
        }
    }
}
