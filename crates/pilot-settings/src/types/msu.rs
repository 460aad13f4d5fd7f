//! MSU liveness settings.

use serde::{Deserialize, Serialize};

/// How long an MSU stays registered without a heartbeat, and how often
/// stale ones are swept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MsuSettings {
    /// Liveness window in milliseconds.
    pub ttl_ms: i64,
    /// Sweep period in milliseconds. `0` disables the sweep task.
    pub sweep_interval_ms: u64,
}

impl Default for MsuSettings {
    fn default() -> Self {
        Self {
            ttl_ms: 30_000,
            sweep_interval_ms: 0,
        }
    }
}
