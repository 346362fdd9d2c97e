//! Process-wide registry and transport.
//!
//! Both are created on first use and live until the process exits.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::{
    Result,
    config::RegistryConfig,
    lifecycle::{Identity, Tracked},
    registry::Registry,
    transport::{LocalTransport, PropertyChange, Transport},
};

static TRANSPORT: OnceLock<Arc<LocalTransport>> = OnceLock::new();
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// The process-wide transport used by [`ObservedObject::new`](crate::ObservedObject::new).
pub fn transport() -> &'static Arc<LocalTransport> {
    TRANSPORT.get_or_init(LocalTransport::shared)
}

/// The process-wide registry, created with default settings on first use.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| build(&RegistryConfig::default()))
}

/// Creates the process-wide registry with `config`.
///
/// Returns `false` if the registry already existed, in which case `config`
/// is ignored.
pub fn init(config: &RegistryConfig) -> bool {
    let mut created = false;
    REGISTRY.get_or_init(|| {
        created = true;
        build(config)
    });
    created
}

fn build(config: &RegistryConfig) -> Registry {
    debug!(?config, "creating process-wide registry");
    let transport: Arc<dyn Transport> = transport().clone();
    Registry::with_config(transport, config)
}

/// [`Registry::add_observer`] on the process-wide registry.
///
/// # Errors
/// See [`Registry::add_observer`].
pub fn add_observer<O, S, F>(observer: &O, subject: &S, path: &str, callback: F) -> Result<()>
where
    O: Tracked + ?Sized,
    S: Tracked + ?Sized,
    F: Fn(&PropertyChange) + Send + Sync + 'static,
{
    registry().add_observer(observer, subject, path, callback)
}

/// [`Registry::remove_observer`] on the process-wide registry.
///
/// # Errors
/// See [`Registry::remove_observer`].
pub fn remove_observer<O, S>(observer: &O, subject: &S, path: &str) -> Result<()>
where
    O: Identity + ?Sized,
    S: Identity + ?Sized,
{
    registry().remove_observer(observer, subject, path)
}
