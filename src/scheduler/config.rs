//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tick cadence, worker pool bound and roster retry tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between ticks
    #[serde(rename = "tick-interval-secs")]
    pub tick_interval_secs: u64,

    /// Max concurrently executing jobs
    #[serde(rename = "max-concurrent-jobs")]
    pub max_concurrent_jobs: usize,

    /// Attempts to load the roster per tick
    #[serde(rename = "roster-attempts")]
    pub roster_attempts: u32,

    /// Delay between roster attempts in seconds
    #[serde(rename = "roster-retry-delay-secs")]
    pub roster_retry_delay_secs: u64,

    /// Best-effort wait for in-flight jobs on shutdown, in seconds
    #[serde(rename = "shutdown-grace-secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 300,
            max_concurrent_jobs: 10,
            roster_attempts: 3,
            roster_retry_delay_secs: 60,
            shutdown_grace_secs: 30,
        }
    }
}

impl SchedulerConfig {
    /// Get the tick interval as a Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Get the roster retry delay as a Duration
    pub fn roster_retry_delay(&self) -> Duration {
        Duration::from_secs(self.roster_retry_delay_secs)
    }

    /// Get the shutdown grace window as a Duration
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(300));
        assert_eq!(config.max_concurrent_jobs, 10);
        assert_eq!(config.roster_attempts, 3);
        assert_eq!(config.roster_retry_delay(), Duration::from_secs(60));
    }
}
