use serde::Serialize;

/// Structured trace events emitted across all chatgate crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        address: String,
    },
    SessionOnline {
        address: String,
        user_id: i64,
        /// Identity bound before this login, when the session was already online.
        previous_user_id: Option<i64>,
    },
    SessionOffline {
        address: String,
        user_id: i64,
    },
    SessionEvicted {
        address: String,
        reason: String,
    },
    SessionsSwept {
        removed: usize,
        remaining: usize,
    },
    CallRejected {
        method: String,
        address: Option<String>,
        kind: String,
    },
    BackendCall {
        service: String,
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "cg_event");
    }
}
