use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_9000")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    /// Take the caller address from the `remote` call metadata header
    /// instead of the TCP peer address.  Only enable this behind a fronting
    /// transport that sets (and strips client-supplied) `remote` headers;
    /// otherwise any client can claim another client's session.
    #[serde(default)]
    pub trust_remote_header: bool,
    /// Upper bound on in-flight gate calls (backpressure).
    #[serde(default = "d_max_concurrent")]
    pub max_concurrent_calls: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9000,
            host: "127.0.0.1".into(),
            trust_remote_header: false,
            max_concurrent_calls: d_max_concurrent(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Gate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Deadline applied to every collaborator call made on behalf of a
    /// client call.  Expiry is reported as a business failure.
    #[serde(default = "d_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: d_call_timeout_ms(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_9000() -> u16 {
    9000
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_max_concurrent() -> usize {
    256
}
fn d_call_timeout_ms() -> u64 {
    5000
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
