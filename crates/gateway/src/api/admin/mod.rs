//! Operational endpoints: health check and session administration.
//!
//! Session administration is mounted behind the admin bearer-token
//! middleware (see `api::auth`).  The health check is public.

mod health;
mod sessions;

pub use health::health;
pub use sessions::{evict_session, list_sessions};
