//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the decision orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Time between ticks (milliseconds).
    /// The first tick fires one full interval after start.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// How many recent bids each campaign evaluation reads.
    #[serde(default = "default_window_limit")]
    pub window_limit: usize,

    /// Maximum campaign evaluations running at once within a tick (0 = unlimited).
    #[serde(default)]
    pub max_concurrent_evaluations: usize,
}

fn default_tick_interval() -> u64 {
    30_000 // 30 seconds
}

fn default_window_limit() -> usize {
    50
}

impl OrchestratorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            window_limit: default_window_limit(),
            max_concurrent_evaluations: 0,
        }
    }
}
