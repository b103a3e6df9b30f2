//! End-to-end scheduler behavior
//!
//! Drives the real Scheduler, JobRunner and InFlightRegistry together with
//! in-memory roster/handler/notifier doubles. Timing-sensitive scenarios run
//! under the paused tokio clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use replyd::error::RosterError;
use replyd::notify::Notifier;
use replyd::roster::{JobDescriptor, JobKind, RosterSource};
use replyd::runner::{JobHandler, RunnerConfig};
use replyd::scheduler::{Scheduler, SchedulerConfig};

struct StaticRoster {
    jobs: Vec<JobDescriptor>,
}

#[async_trait]
impl RosterSource for StaticRoster {
    async fn load(&self) -> Result<Vec<JobDescriptor>, RosterError> {
        Ok(self.jobs.clone())
    }
}

/// Handler whose executions block until released, with per-key failure script
struct ScriptedHandler {
    invocations: AtomicUsize,
    /// How many times each key fails before succeeding
    fail_first: HashMap<String, usize>,
    failures_seen: Mutex<HashMap<String, usize>>,
    release: watch::Receiver<bool>,
}

impl ScriptedHandler {
    fn new(release: watch::Receiver<bool>) -> Self {
        Self {
            invocations: AtomicUsize::new(0),
            fail_first: HashMap::new(),
            failures_seen: Mutex::new(HashMap::new()),
            release,
        }
    }

    fn failing(mut self, key: &str, times: usize) -> Self {
        self.fail_first.insert(key.to_string(), times);
        self
    }
}

#[async_trait]
impl JobHandler for ScriptedHandler {
    async fn execute(&self, job: &JobDescriptor) -> eyre::Result<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        let mut release = self.release.clone();
        while !*release.borrow() {
            release.changed().await.ok();
        }

        let budget = self.fail_first.get(job.key()).copied().unwrap_or(0);
        let mut seen = self.failures_seen.lock().unwrap();
        let count = seen.entry(job.key().to_string()).or_insert(0);
        if *count < budget {
            *count += 1;
            return Err(eyre::eyre!("scripted failure {count} for {}", job.key()));
        }
        Ok(())
    }
}

struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
        })
    }

    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

fn job(name: &str) -> JobDescriptor {
    JobDescriptor::new(JobKind::Autoresponder, name, "tok", format!("sheet-{name}"), true)
}

fn scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        tick_interval_secs: 300,
        max_concurrent_jobs: 10,
        roster_attempts: 3,
        roster_retry_delay_secs: 1,
        shutdown_grace_secs: 10,
    }
}

fn runner_config(attempts: u32) -> RunnerConfig {
    RunnerConfig {
        attempts,
        retry_delay_secs: 120,
        start_jitter_ms: 0,
    }
}

fn build_scheduler(
    jobs: Vec<JobDescriptor>,
    handler: Arc<ScriptedHandler>,
    notifier: Arc<dyn Notifier>,
    attempts: u32,
) -> Scheduler {
    let mut handlers: HashMap<JobKind, Arc<dyn JobHandler>> = HashMap::new();
    handlers.insert(JobKind::Autoresponder, handler);
    Scheduler::new(
        scheduler_config(),
        runner_config(attempts),
        Arc::new(StaticRoster { jobs }),
        handlers,
        notifier,
    )
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

async fn wait_until_idle(scheduler: &Scheduler) {
    while !scheduler.registry().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Overlapping ticks never produce a second concurrent execution of the same
/// key; completion makes the key eligible again.
#[tokio::test(start_paused = true)]
async fn test_no_duplicate_execution_across_ticks() {
    let (release_tx, release_rx) = watch::channel(false);
    let handler = Arc::new(ScriptedHandler::new(release_rx));
    let scheduler = build_scheduler(vec![job("acme")], handler.clone(), RecordingNotifier::new(), 1);

    scheduler.tick().await;
    settle().await;
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);

    // Three more ticks while the first execution is still blocked
    for _ in 0..3 {
        scheduler.tick().await;
        settle().await;
    }
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.registry().len(), 1);

    release_tx.send(true).unwrap();
    wait_until_idle(&scheduler).await;

    scheduler.tick().await;
    settle().await;
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 2);
}

/// A job that succeeds within its attempt budget produces zero notifications.
#[tokio::test(start_paused = true)]
async fn test_retry_success_is_silent() {
    let (_release_tx, release_rx) = watch::channel(true);
    let key = job("acme").key().to_string();
    let handler = Arc::new(ScriptedHandler::new(release_rx).failing(&key, 2));
    let notifier = RecordingNotifier::new();
    let scheduler = build_scheduler(vec![job("acme")], handler.clone(), notifier.clone(), 3);

    scheduler.tick().await;
    wait_until_idle(&scheduler).await;

    // Two failures, success on the third attempt
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 3);
    assert!(notifier.messages().is_empty());
}

/// Exhausting every attempt notifies once and frees the key for the next
/// cycle.
#[tokio::test(start_paused = true)]
async fn test_exhaustion_notifies_and_frees_key() {
    let (_release_tx, release_rx) = watch::channel(true);
    let key = job("acme").key().to_string();
    let handler = Arc::new(ScriptedHandler::new(release_rx).failing(&key, 99));
    let notifier = RecordingNotifier::new();
    let scheduler = build_scheduler(vec![job("acme")], handler.clone(), notifier.clone(), 3);

    scheduler.tick().await;
    wait_until_idle(&scheduler).await;

    assert_eq!(handler.invocations.load(Ordering::SeqCst), 3);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains(&key));

    // Next tick resubmits the same key
    scheduler.tick().await;
    settle().await;
    assert!(handler.invocations.load(Ordering::SeqCst) > 3);
}

/// One failing job does not prevent the rest of the cohort from completing.
#[tokio::test(start_paused = true)]
async fn test_failing_job_does_not_starve_others() {
    let (_release_tx, release_rx) = watch::channel(true);
    let bad_key = job("bad").key().to_string();
    let handler = Arc::new(ScriptedHandler::new(release_rx).failing(&bad_key, 99));
    let notifier = RecordingNotifier::new();
    let jobs = vec![job("bad"), job("good-1"), job("good-2")];
    let scheduler = build_scheduler(jobs, handler.clone(), notifier.clone(), 3);

    scheduler.tick().await;
    wait_until_idle(&scheduler).await;

    // bad: 3 attempts, good-1 and good-2: one each
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 5);
    assert_eq!(notifier.messages().len(), 1);
    assert!(notifier.messages()[0].contains("bad"));
}

/// The driver loop ticks on its period and drains on shutdown.
#[tokio::test(start_paused = true)]
async fn test_run_loop_periodic_and_shutdown() {
    let (_release_tx, release_rx) = watch::channel(true);
    let handler = Arc::new(ScriptedHandler::new(release_rx));
    let scheduler = Arc::new(build_scheduler(
        vec![job("acme")],
        handler.clone(),
        RecordingNotifier::new(),
        1,
    ));

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let driver = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run(shutdown_rx).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 2);

    shutdown_tx.send(()).await.unwrap();
    driver.await.unwrap();
    assert!(scheduler.registry().is_empty());
}
