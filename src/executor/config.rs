//! Executor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry, backoff and cooldown tuning for one executor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Max attempts per call, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Backoff multiplier per attempt
    #[serde(rename = "backoff-factor")]
    pub backoff_factor: f64,

    /// Symmetric jitter range in milliseconds (+/- around the computed delay)
    #[serde(rename = "jitter-ms")]
    pub jitter_ms: u64,

    /// Global pause window after a quota-exhaustion signal, in seconds
    #[serde(rename = "cooldown-window-secs")]
    pub cooldown_window_secs: u64,

    /// Per-call timeout in milliseconds
    #[serde(rename = "call-timeout-ms")]
    pub call_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 30_000,
            backoff_factor: 2.0,
            jitter_ms: 5_000,
            cooldown_window_secs: 900,
            call_timeout_ms: 60_000,
        }
    }
}

impl ExecutorConfig {
    /// Get the cooldown window as a Duration
    pub fn cooldown_window(&self) -> Duration {
        Duration::from_secs(self.cooldown_window_secs)
    }

    /// Get the per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}
