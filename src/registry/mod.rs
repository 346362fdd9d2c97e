//! Observation registry.
//!
//! Keeps exactly one transport registration per (subject, observer, path),
//! absorbs duplicate adds and unmatched removals, and tears observations
//! down from the destruction hooks of the entities involved.

mod delivery;
mod ext;
mod observation;
mod store;


pub use ext::ObserveExt;
pub use observation::{CallbackFailure, ObservationCallback, ObservationKey};
pub use store::Registry;
