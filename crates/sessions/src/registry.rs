//! Concurrent address → session map.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use cg_domain::trace::TraceEvent;

use crate::lifecycle::{EvictionPolicy, EvictionReason};
use crate::session::{Session, SessionSnapshot};

/// Registry of live sessions, one per client address.
///
/// Lock order is registry first, then session.  Session locks are never held
/// while waiting on the registry lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `address`, creating an Offline one on first
    /// contact.
    ///
    /// Concurrent first-time callers all receive the same instance.  The
    /// session is touched before the registry lock is released, so a sweep
    /// cannot evict it between lookup and use.
    pub fn resolve(&self, address: &str) -> Arc<Session> {
        // Fast path: session already exists.
        {
            let sessions = self.sessions.read();
            if let Some(session) = sessions.get(address) {
                session.touch();
                return Arc::clone(session);
            }
        }

        // Slow path: re-check under the write lock and insert.
        let mut created = false;
        let session = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .entry(address.to_owned())
                .or_insert_with(|| {
                    created = true;
                    Arc::new(Session::new(address))
                });
            session.touch();
            Arc::clone(session)
        };

        if created {
            tracing::debug!(address, "session created");
            TraceEvent::SessionCreated {
                address: address.to_owned(),
            }
            .emit();
        }

        session
    }

    /// Bind the session for `address` to `user_id` and move it Online.
    ///
    /// The transition happens under the registry lock.  If the entry was
    /// evicted after the caller resolved it, a fresh session is inserted and
    /// bound instead, so the registry always holds the Online session.
    pub fn authenticate(&self, address: &str, user_id: i64) -> Arc<Session> {
        let mut created = false;
        let session = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .entry(address.to_owned())
                .or_insert_with(|| {
                    created = true;
                    Arc::new(Session::new(address))
                });
            session.authenticate(user_id);
            Arc::clone(session)
        };

        if created {
            tracing::debug!(address, user_id, "session re-created for login");
            TraceEvent::SessionCreated {
                address: address.to_owned(),
            }
            .emit();
        }

        session
    }

    /// Look up a session without creating one.
    pub fn get(&self, address: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(address).cloned()
    }

    /// Drop the session for `address`.  Returns the removed session, if any.
    pub fn remove(&self, address: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.write().remove(address);
        if removed.is_some() {
            TraceEvent::SessionEvicted {
                address: address.to_owned(),
                reason: EvictionReason::Removed.to_string(),
            }
            .emit();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Number of sessions currently Online.
    pub fn online_count(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|s| s.is_online())
            .count()
    }

    /// Snapshots of every session, sorted by address.
    pub fn list(&self) -> Vec<SessionSnapshot> {
        let mut out: Vec<SessionSnapshot> = self
            .sessions
            .read()
            .values()
            .map(|s| s.snapshot())
            .collect();
        out.sort_by(|a, b| a.address.cmp(&b.address));
        out
    }

    /// Evict every session `policy` marks stale at `now` (unix seconds).
    /// Returns the number removed.
    pub fn sweep(&self, policy: &EvictionPolicy, now: i64) -> usize {
        if policy.is_disabled() {
            return 0;
        }

        let mut evicted = Vec::new();
        let remaining = {
            let mut sessions = self.sessions.write();
            sessions.retain(|address, session| {
                match policy.should_evict(&session.snapshot(), now) {
                    Some(reason) => {
                        evicted.push((address.clone(), reason));
                        false
                    }
                    None => true,
                }
            });
            sessions.len()
        };

        for (address, reason) in &evicted {
            TraceEvent::SessionEvicted {
                address: address.clone(),
                reason: reason.to_string(),
            }
            .emit();
        }

        if !evicted.is_empty() {
            TraceEvent::SessionsSwept {
                removed: evicted.len(),
                remaining,
            }
            .emit();
        }

        evicted.len()
    }
}
