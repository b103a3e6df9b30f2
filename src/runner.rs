//! Per-job retry wrapper
//!
//! Wraps one job's business callable in a bounded retry loop with a fixed
//! inter-attempt delay and a small random start jitter. Failures never
//! escalate past the runner; the operator channel hears about a job only when
//! all attempts are spent, after which the job simply becomes eligible again
//! on the next tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::notify::Notifier;
use crate::roster::JobDescriptor;

/// The business callable behind one job kind.
///
/// Signals failure by returning an error, never by terminating the process.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run the job's business logic once
    async fn execute(&self, job: &JobDescriptor) -> eyre::Result<()>;
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Attempts per cycle, including the first
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Delay between attempts in seconds
    #[serde(rename = "retry-delay-secs", default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Max random start delay in milliseconds, to desynchronize a tick's cohort
    #[serde(rename = "start-jitter-ms", default = "default_start_jitter_ms")]
    pub start_jitter_ms: u64,
}

fn default_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    120
}

fn default_start_jitter_ms() -> u64 {
    5_000
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            start_jitter_ms: default_start_jitter_ms(),
        }
    }
}

impl RunnerConfig {
    /// Get the inter-attempt delay as a Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// How a run ended
#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The business callable succeeded on the given attempt
    Completed { attempts: u32 },
    /// All attempts failed; the job did not complete this cycle
    Exhausted { attempts: u32 },
}

/// Bounded retry wrapper around a job's business callable
pub struct JobRunner {
    config: RunnerConfig,
    notifier: Arc<dyn Notifier>,
}

impl JobRunner {
    /// Create a runner
    pub fn new(config: RunnerConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self { config, notifier }
    }

    /// Run the job to completion or exhaustion. Never panics past this
    /// boundary.
    pub async fn run(&self, job: &JobDescriptor, handler: Arc<dyn JobHandler>) -> RunOutcome {
        debug!(key = %job.key(), attempts = self.config.attempts, "JobRunner::run: called");

        if self.config.start_jitter_ms > 0 {
            let jitter = Duration::from_millis(rand::rng().random_range(0..=self.config.start_jitter_ms));
            debug!(key = %job.key(), ?jitter, "JobRunner::run: start jitter");
            tokio::time::sleep(jitter).await;
        }

        let mut last_error = String::new();

        for attempt in 1..=self.config.attempts {
            match handler.execute(job).await {
                Ok(()) => {
                    info!(key = %job.key(), attempt, "JobRunner::run: job completed");
                    return RunOutcome::Completed { attempts: attempt };
                }
                Err(e) => {
                    warn!(
                        key = %job.key(),
                        attempt,
                        max = self.config.attempts,
                        error = %e,
                        "JobRunner::run: attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < self.config.attempts {
                        tokio::time::sleep(self.config.retry_delay()).await;
                    }
                }
            }
        }

        warn!(key = %job.key(), attempts = self.config.attempts, "JobRunner::run: attempts exhausted");
        self.notifier
            .notify(&format!(
                "job {} failed after {} attempts: {}",
                job.key(),
                self.config.attempts,
                last_error
            ))
            .await;

        RunOutcome::Exhausted {
            attempts: self.config.attempts,
        }
    }
}
