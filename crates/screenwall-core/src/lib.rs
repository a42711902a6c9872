//! Screen allocation core.
//!
//! Pure state machines with no I/O. The [`Coordinator`] owns the
//! [`ScreenRegistry`], one [`Session`] per live connection, and the
//! [`Projector`] that fans the public snapshot out to subscribers. Every
//! operation takes `&mut self` and returns a list of [`AllocationAction`]s
//! for a runtime to execute, so the same logic runs unchanged in production
//! (QUIC) and in deterministic simulation.
//!
//! Callers serialize access to the coordinator (a mutex or a single actor
//! task). That one critical section is what makes check-then-set claims
//! atomic and keeps publications in a single global order.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod coordinator;
pub mod env;
pub mod error;
pub mod projector;
pub mod registry;
pub mod session;

pub use coordinator::{AllocationAction, Coordinator, CoordinatorConfig, ReleaseCause, Reply};
pub use env::Environment;
pub use error::{AllocationError, RegistryError};
pub use projector::{Projector, Publication};
pub use registry::{Occupant, Screen, ScreenId, ScreenRegistry};
pub use session::{Session, SessionId, SessionRole};
