use std::{
    fmt, mem,
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use tracing::trace;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(1);

/// Stable, comparable identity of an [`Entity`].
///
/// Ids are process-unique and never reused, so an id that outlives its
/// entity can never alias a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value of the id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies a hook attached with [`Entity::on_destroy`] so its owner can
/// detach it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

type DestructionHook = Box<dyn FnOnce(EntityId) + Send>;

struct EntityState {
    alive: AtomicBool,
    hooks: Mutex<Vec<(HookId, DestructionHook)>>,
}

impl EntityState {
    fn detach(&self, hook: HookId) -> bool {
        let detached = {
            let mut hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
            hooks
                .iter()
                .position(|(id, _)| *id == hook)
                .map(|index| hooks.remove(index))
        };

        detached.is_some()
    }
}

/// An owned identity that can take part in observations.
///
/// Dropping the entity runs its pre-destruction hooks exactly once, in the
/// order they were attached, and only then revokes liveness. Any
/// [`EntityRef`] observes the entity as dead after that point.
pub struct Entity {
    id: EntityId,
    state: Arc<EntityState>,
}

impl Entity {
    /// Creates a live entity with a fresh id.
    pub fn new() -> Self {
        Self {
            id: EntityId::next(),
            state: Arc::new(EntityState {
                alive: AtomicBool::new(true),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Identity of this entity.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Creates a non-owning reference to this entity.
    pub fn downgrade(&self) -> EntityRef {
        EntityRef {
            id: self.id,
            state: Arc::downgrade(&self.state),
        }
    }

    /// Attaches a hook that runs once, right before the entity is torn down.
    ///
    /// Returns an id that [`Entity::detach_hook`] and [`EntityRef::detach_hook`]
    /// accept.
    pub fn on_destroy<F>(&self, hook: F) -> HookId
    where
        F: FnOnce(EntityId) + Send + 'static,
    {
        let id = HookId(NEXT_HOOK_ID.fetch_add(1, Ordering::Relaxed));
        self.state
            .hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Box::new(hook)));
        id
    }

    /// Removes a pending hook without running it.
    ///
    /// Returns `false` if the hook already ran or was detached before.
    pub fn detach_hook(&self, hook: HookId) -> bool {
        self.state.detach(hook)
    }

    /// Number of hooks still waiting to run.
    pub fn pending_hooks(&self) -> usize {
        self.state
            .hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Destroys the entity now. Equivalent to dropping it.
    pub fn destroy(self) {
        drop(self);
    }

    fn teardown(&mut self) {
        let hooks = mem::take(
            &mut *self
                .state
                .hooks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        trace!(entity = %self.id, count = hooks.len(), "running destruction hooks");
        for (_, hook) in hooks {
            hook(self.id);
        }

        self.state.alive.store(false, Ordering::Release);
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Entity {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("pending_hooks", &self.pending_hooks())
            .finish()
    }
}

/// A non-owning reference to an [`Entity`].
///
/// Never extends the entity's lifetime; use [`EntityRef::is_alive`] to test
/// whether it has been torn down.
#[derive(Clone)]
pub struct EntityRef {
    id: EntityId,
    state: Weak<EntityState>,
}

impl EntityRef {
    /// Identity of the referenced entity.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Whether the referenced entity has not yet been torn down.
    pub fn is_alive(&self) -> bool {
        self.state
            .upgrade()
            .is_some_and(|state| state.alive.load(Ordering::Acquire))
    }

    /// Removes a pending hook from the referenced entity without running it.
    ///
    /// Returns `false` if the entity is gone, or the hook already ran or was
    /// detached before.
    pub fn detach_hook(&self, hook: HookId) -> bool {
        self.state.upgrade().is_some_and(|state| state.detach(hook))
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Anything that exposes a stable [`EntityId`].
///
/// Removal only needs identities, so it accepts ids and dead references as
/// well as live entities.
pub trait Identity {
    /// The identity used to key observations.
    fn entity_id(&self) -> EntityId;
}

/// Anything that owns a live [`Entity`] and can therefore carry hooks.
pub trait Tracked {
    /// The entity whose lifetime governs observations involving `self`.
    fn entity(&self) -> &Entity;
}

impl Identity for EntityId {
    fn entity_id(&self) -> EntityId {
        *self
    }
}

impl Identity for Entity {
    fn entity_id(&self) -> EntityId {
        self.id
    }
}

impl Identity for EntityRef {
    fn entity_id(&self) -> EntityId {
        self.id
    }
}

impl<T: Identity + ?Sized> Identity for Arc<T> {
    fn entity_id(&self) -> EntityId {
        (**self).entity_id()
    }
}

impl Tracked for Entity {
    fn entity(&self) -> &Entity {
        self
    }
}

impl<T: Tracked + ?Sized> Tracked for Arc<T> {
    fn entity(&self) -> &Entity {
        (**self).entity()
    }
}
