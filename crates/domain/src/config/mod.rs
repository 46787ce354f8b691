mod backend;
mod observability;
mod server;
mod sessions;

pub use backend::*;
pub use observability::*;
pub use server::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub master: MasterConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Admin
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer token for `/v1/admin/*`.  Takes priority over `token_env`.
    #[serde(default)]
    pub token: Option<String>,
    /// Environment variable holding the admin bearer token.
    /// With neither set, admin endpoints are open (dev mode).
    #[serde(default = "d_admin_token_env")]
    pub token_env: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            token: None,
            token_env: d_admin_token_env(),
        }
    }
}

fn d_admin_token_env() -> String {
    "CG_ADMIN_TOKEN".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error(
                "server.port",
                "port must be greater than 0",
            ));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.max_concurrent_calls == 0 {
            errors.push(ConfigError::error(
                "server.max_concurrent_calls",
                "must be greater than 0",
            ));
        }
        if self.server.trust_remote_header {
            errors.push(ConfigError::warning(
                "server.trust_remote_header",
                "caller addresses are taken from the `remote` header; \
                 only safe behind a transport that sets it",
            ));
        }

        if self.gate.call_timeout_ms == 0 {
            errors.push(ConfigError::error(
                "gate.call_timeout_ms",
                "call deadline must be greater than 0",
            ));
        }

        check_backend(
            &mut errors,
            "master",
            self.master.transport,
            &self.master.base_url,
            self.master.timeout_ms,
        );
        check_backend(
            &mut errors,
            "store",
            self.store.transport,
            &self.store.base_url,
            self.store.timeout_ms,
        );

        if self.sessions.idle_timeout_secs == 0 {
            errors.push(ConfigError::warning(
                "sessions.idle_timeout_secs",
                "eviction disabled; the session registry grows without bound",
            ));
        } else {
            if self.sessions.sweep_interval_secs == 0 {
                errors.push(ConfigError::error(
                    "sessions.sweep_interval_secs",
                    "sweep interval must be greater than 0 when eviction is enabled",
                ));
            }
            // A session must outlive one full collaborator call.
            if self.sessions.idle_timeout_secs.saturating_mul(1000) <= self.gate.call_timeout_ms {
                errors.push(ConfigError::error(
                    "sessions.idle_timeout_secs",
                    format!(
                        "idle timeout must exceed gate.call_timeout_ms ({}ms)",
                        self.gate.call_timeout_ms
                    ),
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError::error(
                "observability.sample_rate",
                "sample rate must be within 0.0..=1.0",
            ));
        }

        errors
    }
}

fn check_backend(
    errors: &mut Vec<ConfigError>,
    section: &str,
    transport: BackendTransport,
    base_url: &str,
    timeout_ms: u64,
) {
    match transport {
        BackendTransport::Memory => errors.push(ConfigError::warning(
            &format!("{section}.transport"),
            "in-process backend; state is lost on restart",
        )),
        BackendTransport::Rest => {
            if base_url.is_empty() {
                errors.push(ConfigError::error(
                    &format!("{section}.base_url"),
                    "base_url must not be empty",
                ));
            } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                errors.push(ConfigError::error(
                    &format!("{section}.base_url"),
                    format!("unsupported scheme in {base_url:?} (expected http:// or https://)"),
                ));
            }
            if timeout_ms == 0 {
                errors.push(ConfigError::error(
                    &format!("{section}.timeout_ms"),
                    "timeout must be greater than 0",
                ));
            }
        }
    }
}
