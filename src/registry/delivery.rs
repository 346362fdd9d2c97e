use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, trace, warn};

use super::{CallbackFailure, ObservationCallback, ObservationKey, Registry, store::RegistryInner};
use crate::transport::{ChangeSink, PropertyChange, TransportHandle};

impl ChangeSink for RegistryInner {
    fn deliver(&self, handle: TransportHandle, change: &PropertyChange) {
        let Some((key, callback)) = self.resolve(handle, change) else {
            return;
        };

        trace!(%key, "delivering change");
        self.invoke(key, &callback, change);
    }
}

impl RegistryInner {
    /// Snapshots the callback for `handle` under the lock.
    fn resolve(
        &self,
        handle: TransportHandle,
        change: &PropertyChange,
    ) -> Option<(ObservationKey, ObservationCallback)> {
        let state = self.lock_state();

        let Some(observation) = state
            .by_handle
            .get(&handle)
            .and_then(|key| state.observations.get(key))
        else {
            trace!(%handle, "no observation for handle, dropping change");
            return None;
        };

        if observation.key.subject != change.subject || observation.key.path != change.path {
            warn!(
                key = %observation.key,
                subject = %change.subject,
                path = %change.path,
                "change does not match its registration, dropping"
            );
            return None;
        }

        if !observation.is_live() {
            trace!(key = %observation.key, "endpoint torn down, dropping change");
            return None;
        }

        Some((observation.key.clone(), Arc::clone(&observation.callback)))
    }

    fn invoke(&self, key: ObservationKey, callback: &ObservationCallback, change: &PropertyChange) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(change)));

        let Err(payload) = outcome else {
            return;
        };

        let message = panic_message(payload.as_ref());
        error!(%key, %message, "observation callback panicked");

        if self.report_failures {
            self.failures.send(CallbackFailure::new(key, message)).ok();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "callback panicked with a non-string payload".to_string()
    }
}

impl Registry {
    /// Subscribes to callback failures caught during delivery.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<CallbackFailure> {
        self.inner.failures.subscribe()
    }

    /// Creates a stream of callback failures caught during delivery.
    ///
    /// Failures raised before the stream was created are not replayed. If the
    /// consumer falls behind the channel capacity, the oldest failures are
    /// skipped.
    pub fn failures(&self) -> impl Stream<Item = CallbackFailure> + use<> {
        let receiver = self.inner.failures.subscribe();

        futures::stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(failure) => return Some((failure, receiver)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "failure stream lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }
}
