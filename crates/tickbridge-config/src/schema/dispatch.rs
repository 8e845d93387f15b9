//! Dispatch and pump configuration types.

use serde::{Deserialize, Serialize};

/// How queued callbacks are handed to the host each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    /// Execute at most one callback per host tick.
    pub one_callback_per_tick: bool,
    /// Cap on callbacks executed per tick when not throttled (0 = unlimited).
    pub batch_limit: u32,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            one_callback_per_tick: true,
            batch_limit: 0,
        }
    }
}

/// Native pump and host tick cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpSection {
    /// Issue the per-tick pump call to the native side.
    pub enabled: bool,
    /// Host tick interval in milliseconds (valid range: 1-1000).
    pub tick_interval_ms: u32,
}

impl Default for PumpSection {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_ms: 16,
        }
    }
}
