//! safe-observe - Safe property observation over an unforgiving transport.
//!
//! A change transport that stacks duplicate registrations, fails on
//! unmatched removals, and keeps delivering to observers that were torn down
//! is easy to misuse. This crate puts a registry in front of it:
//!
//! - Adding the same observation twice replaces the callback
//! - Removing an observation that does not exist is a no-op
//! - Destroying the subject or the observer drops its observations first
//! - A panicking callback is reported, not propagated
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use safe_observe::{Entity, ObservedObject, ObserveExt};
//!
//! let subject = ObservedObject::new();
//! let observer = Entity::new();
//!
//! subject
//!     .observe(&observer, "count", |change| {
//!         println!("{:?} -> {}", change.old_value, change.new_value);
//!     })
//!     .unwrap();
//!
//! subject.set("count", 5).unwrap();
//!
//! // No explicit removal needed: dropping either side ends the observation.
//! drop(observer);
//! subject.set("count", 9).unwrap();
//! ```

/// Configuration schema and loading.
pub mod config;

/// Core error types and result aliases.
pub mod core;

/// Process-wide registry and transport.
pub mod global;

/// Entity identities and pre-destruction hooks.
pub mod lifecycle;

/// Observation registry.
pub mod registry;

/// Tracing subscriber setup.
pub mod tracing_config;

/// Change-notification transport seam.
pub mod transport;

pub use crate::core::{ObserveError, Result};
pub use global::{add_observer, remove_observer};
pub use lifecycle::{Entity, EntityId, EntityRef, HookId, Identity, Tracked};
pub use registry::{CallbackFailure, ObservationKey, ObserveExt, Registry};
pub use transport::{LocalTransport, ObservedObject, PropertyChange, PropertyPath};
