//! Session management for chatgate.
//!
//! One [`Session`] per client network address, held in a concurrent
//! [`SessionRegistry`].  Sessions start Offline, become Online after a
//! successful login, and are evicted by the idle sweeper once they have been
//! Offline and untouched for longer than the configured threshold.

pub mod lifecycle;
pub mod registry;
pub mod session;
pub mod sweeper;

pub use lifecycle::{EvictionPolicy, EvictionReason};
pub use registry::SessionRegistry;
pub use session::{Session, SessionSnapshot, SessionState};
pub use sweeper::{spawn_sweeper, SweeperHandle};
