use crate::{
    Result, global,
    lifecycle::{Identity, Tracked},
    transport::PropertyChange,
};

/// Subject-side shorthand for the process-wide registry.
///
/// ```rust,no_run
/// use safe_observe::{Entity, ObservedObject, ObserveExt};
///
/// let subject = ObservedObject::new();
/// let observer = Entity::new();
///
/// subject
///     .observe(&observer, "count", |change| println!("{:?}", change.new_value))
///     .unwrap();
/// subject.set("count", 5).unwrap();
/// subject.unobserve(&observer, "count").unwrap();
/// ```
pub trait ObserveExt: Tracked {
    /// Lets `observer` observe `path` on `self`, replacing any previous
    /// callback for the same observer and path.
    ///
    /// # Errors
    /// See [`Registry::add_observer`](crate::Registry::add_observer).
    fn observe<O, F>(&self, observer: &O, path: &str, callback: F) -> Result<()>
    where
        O: Tracked + ?Sized,
        F: Fn(&PropertyChange) + Send + Sync + 'static,
    {
        global::registry().add_observer(observer, self, path, callback)
    }

    /// Stops `observer` from observing `path` on `self`. A no-op if it was
    /// not observing.
    ///
    /// # Errors
    /// See [`Registry::remove_observer`](crate::Registry::remove_observer).
    fn unobserve<O>(&self, observer: &O, path: &str) -> Result<()>
    where
        O: Identity + ?Sized,
    {
        global::registry().remove_observer(observer, &self.entity().id(), path)
    }
}

impl<T: Tracked + ?Sized> ObserveExt for T {}
