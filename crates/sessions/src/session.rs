//! A single client session keyed by network address.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use cg_domain::trace::TraceEvent;

/// Authentication state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Offline,
    Online,
}

#[derive(Debug)]
struct SessionInner {
    user_id: i64,
    state: SessionState,
    last_activity: i64,
}

/// Mutable record of one client's authentication state.
///
/// The address is fixed at creation.  Everything else sits behind one lock,
/// so readers always see `state` and `user_id` from the same transition.
#[derive(Debug)]
pub struct Session {
    address: String,
    inner: RwLock<SessionInner>,
}

/// Point-in-time copy of a session, served by the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub address: String,
    pub user_id: i64,
    pub state: SessionState,
    pub last_activity: i64,
}

pub(crate) fn unix_now() -> i64 {
    Utc::now().timestamp()
}

impl Session {
    /// New Offline session with no identity.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            inner: RwLock::new(SessionInner {
                user_id: 0,
                state: SessionState::Offline,
                last_activity: unix_now(),
            }),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Bind `user_id` and move to Online.
    ///
    /// An existing binding is overwritten; the previous identity is reported
    /// in the emitted event.
    pub fn authenticate(&self, user_id: i64) {
        let previous = {
            let mut inner = self.inner.write();
            let previous = (inner.state == SessionState::Online).then_some(inner.user_id);
            inner.user_id = user_id;
            inner.state = SessionState::Online;
            inner.last_activity = unix_now();
            previous
        };

        if let Some(prev) = previous.filter(|p| *p != user_id) {
            tracing::warn!(
                address = %self.address,
                previous_user_id = prev,
                user_id,
                "session identity replaced by a second login"
            );
        }

        TraceEvent::SessionOnline {
            address: self.address.clone(),
            user_id,
            previous_user_id: previous,
        }
        .emit();
    }

    /// Move to Offline and drop the identity binding.
    pub fn deauthenticate(&self) {
        let user_id = {
            let mut inner = self.inner.write();
            let user_id = inner.user_id;
            inner.user_id = 0;
            inner.state = SessionState::Offline;
            inner.last_activity = unix_now();
            user_id
        };

        TraceEvent::SessionOffline {
            address: self.address.clone(),
            user_id,
        }
        .emit();
    }

    /// Refresh the last-activity timestamp.
    pub fn touch(&self) {
        self.inner.write().last_activity = unix_now();
    }

    pub fn is_online(&self) -> bool {
        self.inner.read().state == SessionState::Online
    }

    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    /// Bound user id, `0` when none.
    pub fn identity(&self) -> i64 {
        self.inner.read().user_id
    }

    /// The bound user id if, and only if, the session is Online.
    pub fn online_identity(&self) -> Option<i64> {
        let inner = self.inner.read();
        (inner.state == SessionState::Online).then_some(inner.user_id)
    }

    /// Unix seconds of the last refresh.
    pub fn last_activity(&self) -> i64 {
        self.inner.read().last_activity
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.read();
        SessionSnapshot {
            address: self.address.clone(),
            user_id: inner.user_id,
            state: inner.state,
            last_activity: inner.last_activity,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_last_activity(&self, ts: i64) {
        self.inner.write().last_activity = ts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_offline_without_identity() {
        let s = Session::new("10.0.0.1:5000");
        assert_eq!(s.address(), "10.0.0.1:5000");
        assert_eq!(s.state(), SessionState::Offline);
        assert_eq!(s.identity(), 0);
        assert!(s.online_identity().is_none());
        assert!(s.last_activity() > 0);
    }

    #[test]
    fn authenticate_binds_identity() {
        let s = Session::new("10.0.0.1:5000");
        s.authenticate(42);
        assert!(s.is_online());
        assert_eq!(s.online_identity(), Some(42));
    }

    #[test]
    fn second_login_overwrites_binding() {
        let s = Session::new("10.0.0.1:5000");
        s.authenticate(42);
        s.authenticate(7);
        assert_eq!(s.online_identity(), Some(7));
    }

    #[test]
    fn deauthenticate_clears_identity() {
        let s = Session::new("10.0.0.1:5000");
        s.authenticate(42);
        s.deauthenticate();
        assert_eq!(s.state(), SessionState::Offline);
        assert_eq!(s.identity(), 0);
        assert!(s.online_identity().is_none());
    }

    #[test]
    fn touch_refreshes_without_changing_state() {
        let s = Session::new("10.0.0.1:5000");
        s.set_last_activity(100);
        s.touch();
        assert!(s.last_activity() > 100);
        assert_eq!(s.state(), SessionState::Offline);
    }

    #[test]
    fn snapshot_serializes_lowercase_state() {
        let s = Session::new("10.0.0.1:5000");
        s.authenticate(42);
        let json = serde_json::to_value(s.snapshot()).unwrap();
        assert_eq!(json["state"], "online");
        assert_eq!(json["user_id"], 42);
        assert_eq!(json["address"], "10.0.0.1:5000");
    }
}
