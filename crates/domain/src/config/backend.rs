use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Collaborator connections (ID allocator + account store)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the gateway talks to a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendTransport {
    /// HTTP/JSON against the collaborator's REST API.
    Rest,
    /// In-process implementation (development and tests).
    Memory,
}

/// ID allocator ("master") connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    #[serde(default = "d_transport")]
    pub transport: BackendTransport,
    #[serde(default = "d_master_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    /// First identifier handed out by the in-process allocator.
    #[serde(default = "d_first_id")]
    pub first_id: i64,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            transport: BackendTransport::Rest,
            base_url: d_master_url(),
            api_key: None,
            timeout_ms: d_timeout_ms(),
            first_id: d_first_id(),
        }
    }
}

/// Persistent account store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "d_transport")]
    pub transport: BackendTransport,
    #[serde(default = "d_store_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            transport: BackendTransport::Rest,
            base_url: d_store_url(),
            api_key: None,
            timeout_ms: d_timeout_ms(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_transport() -> BackendTransport {
    BackendTransport::Rest
}
fn d_master_url() -> String {
    "http://localhost:9001".into()
}
fn d_store_url() -> String {
    "http://localhost:9002".into()
}
fn d_timeout_ms() -> u64 {
    3000
}
fn d_first_id() -> i64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_parses_lowercase() {
        let cfg: StoreConfig = toml::from_str(r#"transport = "memory""#).unwrap();
        assert_eq!(cfg.transport, BackendTransport::Memory);
    }

    #[test]
    fn master_defaults() {
        let cfg: MasterConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.transport, BackendTransport::Rest);
        assert_eq!(cfg.base_url, "http://localhost:9001");
        assert_eq!(cfg.first_id, 1);
        assert!(cfg.api_key.is_none());
    }
}
