use std::{
    collections::HashMap,
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

use super::{CallbackFailure, ObservationCallback, ObservationKey, observation::Observation};
use crate::{
    Result,
    config::RegistryConfig,
    lifecycle::{Entity, EntityId, EntityRef, HookId, Identity, Tracked},
    transport::{ChangeSink, PropertyChange, PropertyPath, Transport, TransportHandle},
};

/// Bookkeeping guarded by the registry lock.
#[derive(Default)]
pub(super) struct RegistryState {
    pub(super) observations: HashMap<ObservationKey, Observation>,
    pub(super) by_handle: HashMap<TransportHandle, ObservationKey>,
    /// Entities that already carry this registry's destruction hook.
    pub(super) tracked: HashMap<EntityId, TrackedEntity>,
}

/// Where this registry's destruction hook lives, so it can be detached.
pub(super) struct TrackedEntity {
    entity: EntityRef,
    hook: HookId,
}

impl RegistryState {
    fn take(&mut self, key: &ObservationKey) -> Option<Observation> {
        let observation = self.observations.remove(key)?;
        self.by_handle.remove(&observation.handle);
        Some(observation)
    }
}

pub(super) struct RegistryInner {
    state: Mutex<RegistryState>,
    transport: Arc<dyn Transport>,
    pub(super) failures: broadcast::Sender<CallbackFailure>,
    pub(super) report_failures: bool,
    weak_self: Weak<RegistryInner>,
}

impl RegistryInner {
    pub(super) fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        // Callbacks never run under this lock, so a poisoned guard still
        // holds consistent bookkeeping.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sink(&self) -> Weak<dyn ChangeSink> {
        self.weak_self.clone()
    }

    fn unregister(&self, observation: &Observation) {
        if let Err(e) = self.transport.unregister(observation.handle) {
            warn!(key = %observation.key, error = %e, "transport rejected unregister");
        }
    }

    fn attach_hook(&self, state: &mut RegistryState, entity: &Entity) {
        if state.tracked.contains_key(&entity.id()) {
            return;
        }

        let registry = Weak::clone(&self.weak_self);
        let hook = entity.on_destroy(move |id| {
            if let Some(registry) = registry.upgrade() {
                registry.drop_observations(id, true);
            }
        });

        state.tracked.insert(
            entity.id(),
            TrackedEntity {
                entity: entity.downgrade(),
                hook,
            },
        );
    }

    /// Removes every observation involving `entity`.
    ///
    /// `hook_fired` is set only from the destruction hook itself; the entity
    /// then no longer carries it and is forgotten.
    pub(super) fn drop_observations(&self, entity: EntityId, hook_fired: bool) {
        let removed: Vec<Observation> = {
            let mut state = self.lock_state();
            if hook_fired {
                state.tracked.remove(&entity);
            }

            let keys: Vec<ObservationKey> = state
                .observations
                .keys()
                .filter(|key| key.involves(entity))
                .cloned()
                .collect();

            keys.iter()
                .filter_map(|key| state.take(key))
                .inspect(|observation| self.unregister(observation))
                .collect()
        };

        if !removed.is_empty() {
            debug!(%entity, removed = removed.len(), "entity destroyed, observations dropped");
        }

        // Callbacks are dropped outside the lock; they may own entities whose
        // teardown re-enters the registry.
        drop(removed);
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        let state = mem::take(self.state.get_mut().unwrap_or_else(PoisonError::into_inner));

        for observation in state.observations.values() {
            self.unregister(observation);
        }

        for tracked in state.tracked.values() {
            tracked.entity.detach_hook(tracked.hook);
        }
    }
}

/// Registry of active observations.
///
/// Makes observing safe on top of a [`Transport`] that is not:
///
/// - adding the same (observer, subject, path) again replaces the previous
///   callback and never stacks a second transport registration
/// - removing an observation that does not exist is a no-op
/// - destroying the subject or the observer drops every observation that
///   involves it before the entity becomes invalid
///
/// Cloning a `Registry` yields another handle to the same bookkeeping.
#[derive(Clone)]
pub struct Registry {
    pub(super) inner: Arc<RegistryInner>,
}

impl Registry {
    /// Creates a registry over `transport` with default settings.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, &RegistryConfig::default())
    }

    /// Creates a registry over `transport` using `config`.
    pub fn with_config(transport: Arc<dyn Transport>, config: &RegistryConfig) -> Self {
        let (failures, _) = broadcast::channel(config.failure_channel_capacity.max(1));

        let inner = Arc::new_cyclic(|weak_self| RegistryInner {
            state: Mutex::new(RegistryState::default()),
            transport,
            failures,
            report_failures: config.report_callback_failures,
            weak_self: Weak::clone(weak_self),
        });

        Self { inner }
    }

    /// Observes `path` on `subject` on behalf of `observer`.
    ///
    /// If the same observer already observes the same path on the same
    /// subject, the old transport registration is removed first and the new
    /// callback replaces the old one.
    ///
    /// # Arguments
    /// * `observer` - The entity interested in the change
    /// * `subject` - The entity whose property is observed
    /// * `path` - Property name or dotted chain
    /// * `callback` - Invoked once per change with the unchanged old and new values
    ///
    /// # Errors
    /// * `ObserveError::InvalidArgument` - If `path` is not a valid property path
    /// * `ObserveError::Transport` - If the transport refuses the registration;
    ///   no observation exists for the key afterwards
    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn add_observer<O, S, F>(
        &self,
        observer: &O,
        subject: &S,
        path: &str,
        callback: F,
    ) -> Result<()>
    where
        O: Tracked + ?Sized,
        S: Tracked + ?Sized,
        F: Fn(&PropertyChange) + Send + Sync + 'static,
    {
        let path = PropertyPath::parse(path)?;
        let observer = observer.entity();
        let subject = subject.entity();
        let key = ObservationKey::new(subject.id(), observer.id(), path.clone());
        let callback: ObservationCallback = Arc::new(callback);

        let mut state = self.inner.lock_state();

        let previous = state.take(&key);
        if let Some(previous) = &previous {
            debug!(%key, "replacing existing observation");
            self.inner.unregister(previous);
        }

        let registered = self
            .inner
            .transport
            .register(subject.id(), &path, self.inner.sink());

        let handle = match registered {
            Ok(handle) => handle,
            Err(e) => {
                drop(state);
                drop(previous);
                return Err(e.into());
            }
        };

        state.by_handle.insert(handle, key.clone());
        state.observations.insert(
            key.clone(),
            Observation {
                key: key.clone(),
                callback,
                subject_ref: subject.downgrade(),
                observer_ref: observer.downgrade(),
                handle,
            },
        );

        self.inner.attach_hook(&mut state, subject);
        self.inner.attach_hook(&mut state, observer);

        drop(state);
        drop(previous);

        debug!(%key, %handle, "observation active");
        Ok(())
    }

    /// Stops `observer` from observing `path` on `subject`.
    ///
    /// Safe to call at any time, including after either entity has been
    /// destroyed or when no such observation exists.
    ///
    /// # Errors
    /// * `ObserveError::InvalidArgument` - If `path` is not a valid property path
    #[instrument(level = "debug", skip_all, fields(path = %path))]
    pub fn remove_observer<O, S>(&self, observer: &O, subject: &S, path: &str) -> Result<()>
    where
        O: Identity + ?Sized,
        S: Identity + ?Sized,
    {
        let path = PropertyPath::parse(path)?;
        let key = ObservationKey::new(subject.entity_id(), observer.entity_id(), path);

        let removed = {
            let mut state = self.inner.lock_state();
            let removed = state.take(&key);
            if let Some(observation) = &removed {
                self.inner.unregister(observation);
            }
            removed
        };

        match removed {
            Some(_) => debug!(%key, "observation removed"),
            None => debug!(%key, "no active observation, nothing to remove"),
        }

        Ok(())
    }

    /// Drops every observation in which `entity` is subject or observer.
    ///
    /// Runs automatically from the destruction hook of every tracked entity.
    /// Hosts with their own teardown path may also call it directly; the
    /// entity keeps its single hook, so observing it again attaches no more.
    pub fn on_entity_destroyed(&self, entity: EntityId) {
        self.inner.drop_observations(entity, false);
    }

    /// Number of active observations.
    pub fn observation_count(&self) -> usize {
        self.inner.lock_state().observations.len()
    }

    /// Whether an observation exists for (`observer`, `subject`, `path`).
    pub fn contains<O, S>(&self, observer: &O, subject: &S, path: &str) -> bool
    where
        O: Identity + ?Sized,
        S: Identity + ?Sized,
    {
        let Ok(path) = PropertyPath::parse(path) else {
            return false;
        };

        let key = ObservationKey::new(subject.entity_id(), observer.entity_id(), path);
        self.inner.lock_state().observations.contains_key(&key)
    }

    /// Keys of every observation on `subject`, in key order.
    pub fn observations_for_subject<S>(&self, subject: &S) -> Vec<ObservationKey>
    where
        S: Identity + ?Sized,
    {
        let subject = subject.entity_id();
        let mut keys: Vec<ObservationKey> = self
            .inner
            .lock_state()
            .observations
            .keys()
            .filter(|key| key.subject == subject)
            .cloned()
            .collect();

        keys.sort();
        keys
    }

    /// Number of entities carrying this registry's destruction hook.
    pub fn tracked_entity_count(&self) -> usize {
        self.inner.lock_state().tracked.len()
    }
}
