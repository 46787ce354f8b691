//! Session eviction lifecycle.
//!
//! Evaluated by the sweeper against every registered session.  Only Offline
//! sessions are candidates: an Online session keeps its identity binding
//! until it is removed explicitly.

use cg_domain::config::SessionsConfig;

use crate::session::{SessionSnapshot, SessionState};

/// Reason a session was evicted from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvictionReason {
    IdleTimeout { idle_secs: i64 },
    Removed,
}

impl std::fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdleTimeout { idle_secs } => write!(f, "idle timeout ({idle_secs}s)"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// Decides whether a session is stale.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    /// `0` disables idle eviction.
    idle_timeout_secs: u64,
}

impl EvictionPolicy {
    pub fn new(idle_timeout_secs: u64) -> Self {
        Self { idle_timeout_secs }
    }

    pub fn from_config(config: &SessionsConfig) -> Self {
        Self::new(config.idle_timeout_secs)
    }

    pub fn is_disabled(&self) -> bool {
        self.idle_timeout_secs == 0
    }

    /// Returns `Some(reason)` when the session should be evicted at `now`
    /// (unix seconds).
    pub fn should_evict(&self, session: &SessionSnapshot, now: i64) -> Option<EvictionReason> {
        if self.is_disabled() || session.state == SessionState::Online {
            return None;
        }

        let idle = now.saturating_sub(session.last_activity);
        if idle >= self.idle_timeout_secs as i64 {
            return Some(EvictionReason::IdleTimeout { idle_secs: idle });
        }

        None
    }
}
