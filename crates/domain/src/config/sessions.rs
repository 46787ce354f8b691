use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session registry housekeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// How often the sweeper scans the registry.
    #[serde(default = "d_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Offline sessions idle for at least this long are evicted.
    /// `0` disables eviction.
    #[serde(default = "d_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: d_sweep_interval(),
            idle_timeout_secs: d_idle_timeout(),
        }
    }
}

fn d_sweep_interval() -> u64 {
    60
}
fn d_idle_timeout() -> u64 {
    1800
}
