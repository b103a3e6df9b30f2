//! Dedup scheduler
//!
//! On a fixed tick: load the roster, skip jobs already in flight, submit the
//! rest to a bounded worker pool, and remove each key when its run finishes.
//! A tick is idempotent and safe while previous submissions are still
//! running; no failure in a job, call or tick terminates the process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::notify::Notifier;
use crate::roster::{JobDescriptor, JobKind, RosterSource};
use crate::runner::{JobHandler, JobRunner, RunnerConfig};

use super::config::SchedulerConfig;
use super::registry::InFlightRegistry;

/// Periodic roster-check-and-submit driver
pub struct Scheduler {
    config: SchedulerConfig,
    runner_config: RunnerConfig,
    roster: Arc<dyn RosterSource>,
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
    notifier: Arc<dyn Notifier>,
    registry: Arc<InFlightRegistry>,
    workers: Arc<Semaphore>,
}

impl Scheduler {
    /// Create a scheduler over the given collaborators
    pub fn new(
        config: SchedulerConfig,
        runner_config: RunnerConfig,
        roster: Arc<dyn RosterSource>,
        handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        debug!(?config, "Scheduler::new: called");
        Self {
            workers: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            config,
            runner_config,
            roster,
            handlers,
            notifier,
            registry: Arc::new(InFlightRegistry::new()),
        }
    }

    /// The in-flight registry (exposed for status reporting and tests)
    pub fn registry(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }

    /// Drive the tick loop until a shutdown signal arrives, then drain
    /// in-flight jobs best effort.
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(
            tick_secs = self.config.tick_interval_secs,
            max_concurrent = self.config.max_concurrent_jobs,
            "Scheduler::run: starting"
        );

        // First tick fires immediately, then on the fixed period
        let mut interval = tokio::time::interval(self.config.tick_interval());

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = shutdown_rx.recv() => {
                    info!("Scheduler::run: shutdown signal received");
                    break;
                }
            }
        }

        self.drain().await;
        info!("Scheduler::run: stopped");
    }

    /// One roster-check-and-submit cycle
    pub async fn tick(&self) {
        debug!(in_flight = self.registry.len(), "Scheduler::tick: called");

        let Some(jobs) = self.load_roster().await else {
            // Roster unavailable aborts only this tick, never the process
            return;
        };

        let purged = self.registry.purge_finished();
        if purged > 0 {
            warn!(purged, "Scheduler::tick: purged finished entries missed by completion callbacks");
        }

        let mut submitted = 0;
        for job in jobs {
            if !job.enabled {
                debug!(key = %job.key(), "Scheduler::tick: job disabled, skipping");
                continue;
            }
            let Some(handler) = self.handlers.get(&job.kind) else {
                warn!(key = %job.key(), kind = %job.kind, "Scheduler::tick: no handler registered for kind");
                continue;
            };
            if self.submit(job, handler.clone()) {
                submitted += 1;
            }
        }

        debug!(submitted, in_flight = self.registry.len(), "Scheduler::tick: done");
    }

    /// Submit one job unless its key is already in flight.
    ///
    /// The absent-check, task spawn and handle record happen atomically in
    /// the registry. The worker task waits for a pool slot internally, so a
    /// queued submission already counts as RUNNING for dedup purposes and
    /// submission never blocks the tick.
    fn submit(&self, job: JobDescriptor, handler: Arc<dyn JobHandler>) -> bool {
        let key = job.key().to_string();
        let registry = self.registry.clone();
        let workers = self.workers.clone();
        let notifier = self.notifier.clone();
        let runner_config = self.runner_config.clone();

        let inserted = self.registry.try_insert_with(&key, move || {
            tokio::spawn(async move {
                let _permit = match workers.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        // Pool closed during shutdown
                        registry.remove(job.key());
                        return;
                    }
                };

                let runner = JobRunner::new(runner_config, notifier);
                let _outcome = runner.run(&job, handler).await;

                // Completion callback: exactly once, success or not
                registry.remove(job.key());
            })
        });

        if inserted {
            info!(%key, "Scheduler::submit: job submitted");
        } else {
            debug!(%key, "Scheduler::submit: already in flight, skipping");
        }
        inserted
    }

    /// Load the roster with bounded retries; `None` gives up for this tick
    async fn load_roster(&self) -> Option<Vec<JobDescriptor>> {
        for attempt in 1..=self.config.roster_attempts {
            match self.roster.load().await {
                Ok(jobs) => {
                    debug!(count = jobs.len(), attempt, "Scheduler::load_roster: loaded");
                    return Some(jobs);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max = self.config.roster_attempts,
                        error = %e,
                        "Scheduler::load_roster: roster fetch failed"
                    );
                    if attempt < self.config.roster_attempts {
                        tokio::time::sleep(self.config.roster_retry_delay()).await;
                    } else {
                        self.notifier
                            .notify(&format!(
                                "roster unavailable after {} attempts: {e}",
                                self.config.roster_attempts
                            ))
                            .await;
                    }
                }
            }
        }
        None
    }

    /// Best-effort wait for in-flight jobs after shutdown; new submissions
    /// have already stopped because ticking stopped.
    async fn drain(&self) {
        if self.registry.is_empty() {
            return;
        }
        info!(in_flight = self.registry.len(), "Scheduler::drain: waiting for in-flight jobs");

        let deadline = Instant::now() + self.config.shutdown_grace();
        while !self.registry.is_empty() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        if !self.registry.is_empty() {
            warn!(in_flight = self.registry.len(), "Scheduler::drain: grace period expired with jobs still running");
        }
    }
}
