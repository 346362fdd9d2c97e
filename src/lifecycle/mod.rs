//! Entity identities and pre-destruction hooks.
//!
//! Rust has no implicit "about to be deallocated" notification for arbitrary
//! objects, so anything that takes part in an observation owns an [`Entity`]
//! whose `Drop` runs the hooks attached to it before liveness is revoked.

mod entity;


pub use entity::{Entity, EntityId, EntityRef, HookId, Identity, Tracked};
