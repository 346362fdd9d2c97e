//! Change-notification transport seam.
//!
//! A [`Transport`] is the underlying mechanism that actually notices property
//! changes. It hands out one [`TransportHandle`] per registration and reports
//! each change to the [`ChangeSink`] that registered it. The registry is the
//! only caller that should talk to a transport directly.

mod change;
mod local;
mod object;

#[cfg(test)]
mod tests;

use std::{fmt, sync::Weak};

pub use change::{PropertyChange, PropertyPath};
pub use local::LocalTransport;
pub use object::ObservedObject;

use crate::lifecycle::EntityId;

/// Opaque handle for one active transport registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportHandle(pub(crate) u64);

impl fmt::Display for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// Errors raised by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The handle was never issued or has already been unregistered.
    #[error("no active registration for {0}")]
    UnknownHandle(TransportHandle),

    /// The sink passed to `register` has already been dropped.
    #[error("change sink is no longer available")]
    SinkUnavailable,
}

/// Receiver of changes for the registrations it created.
pub trait ChangeSink: Send + Sync {
    /// Called by the transport once per registration whenever the registered
    /// property changes.
    fn deliver(&self, handle: TransportHandle, change: &PropertyChange);
}

/// The native change-notification mechanism.
///
/// Implementations are not required to tolerate misuse: unregistering an
/// unknown handle is an error, and registering twice produces two
/// independent deliveries per change.
pub trait Transport: Send + Sync {
    /// Starts reporting changes of `path` on `subject` to `sink`.
    ///
    /// # Errors
    /// Returns `TransportError::SinkUnavailable` if `sink` can no longer be upgraded.
    fn register(
        &self,
        subject: EntityId,
        path: &PropertyPath,
        sink: Weak<dyn ChangeSink>,
    ) -> Result<TransportHandle, TransportError>;

    /// Stops the registration identified by `handle`.
    ///
    /// # Errors
    /// Returns `TransportError::UnknownHandle` if `handle` is not active.
    fn unregister(&self, handle: TransportHandle) -> Result<(), TransportError>;
}
