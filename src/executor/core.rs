//! Resilient request executor
//!
//! Issues a single outbound call with bounded retries, exponential backoff
//! with jitter, server-supplied retry delays, and a process-wide cooldown
//! gate consulted before every dispatch.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use super::config::ExecutorConfig;
use super::cooldown::CooldownGate;
use super::descriptor::{RequestDescriptor, RequestOutcome, error_summary};
use super::profile::ProviderProfile;
use super::transport::Transport;

/// Floor for every inter-attempt delay
const MIN_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Executor for one downstream provider.
///
/// All jobs calling the same provider share one executor, so they also share
/// its cooldown gate.
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    profile: ProviderProfile,
    gate: CooldownGate,
    config: ExecutorConfig,
}

impl RequestExecutor {
    /// Create an executor over the given transport
    pub fn new(transport: Arc<dyn Transport>, profile: ProviderProfile, gate: CooldownGate, config: ExecutorConfig) -> Self {
        debug!(provider = %profile.name, ?config, "RequestExecutor::new: called");
        Self {
            transport,
            profile,
            gate,
            config,
        }
    }

    /// The provider's shared cooldown gate
    pub fn gate(&self) -> &CooldownGate {
        &self.gate
    }

    /// The per-call timeout from this executor's configuration
    pub fn call_timeout(&self) -> Duration {
        self.config.call_timeout()
    }

    /// Execute one call with bounded retries.
    ///
    /// Deterministic in attempt count, non-deterministic in wall-clock delay.
    /// Returns the last observed outcome when attempts run out; never
    /// silently succeeds.
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> RequestOutcome {
        debug!(provider = %self.profile.name, label = %descriptor.label, "RequestExecutor::execute: called");

        // Provider known to be rate-limited: fail fast without dispatching.
        // The caller's own retry loop treats this like any failed attempt.
        if let Some(remaining) = self.gate.remaining() {
            debug!(provider = %self.profile.name, ?remaining, "RequestExecutor::execute: cooldown active, suppressing call");
            return RequestOutcome::Retriable {
                status: None,
                retry_after: Some(remaining),
                quota: false,
                detail: format!("provider {} is cooling down", self.profile.name),
            };
        }

        let mut last_outcome = RequestOutcome::Transport {
            cause: "no attempt executed".to_string(),
        };

        for attempt in 1..=self.config.max_attempts {
            let response = match self.transport.send(descriptor).await {
                Ok(response) => response,
                Err(fault) => {
                    warn!(
                        provider = %self.profile.name,
                        label = %descriptor.label,
                        attempt,
                        max = self.config.max_attempts,
                        timed_out = fault.timed_out,
                        cause = %fault.cause,
                        "RequestExecutor::execute: transport error"
                    );
                    last_outcome = RequestOutcome::Transport { cause: fault.cause };
                    if attempt < self.config.max_attempts {
                        tokio::time::sleep(self.retry_delay(None, attempt)).await;
                    }
                    continue;
                }
            };

            let status = response.status;

            if (200..300).contains(&status) {
                debug!(provider = %self.profile.name, label = %descriptor.label, status, "RequestExecutor::execute: success");
                return RequestOutcome::Success(super::descriptor::Payload {
                    status,
                    body: response.body,
                });
            }

            let detail = error_summary(&response.body);

            // Quota exhaustion pauses all traffic to this provider, on any
            // attempt; further local retries would only hit the same wall.
            if self.profile.is_quota(status, &response.body) {
                let window = self.config.cooldown_window();
                warn!(
                    provider = %self.profile.name,
                    label = %descriptor.label,
                    status,
                    ?window,
                    %detail,
                    "RequestExecutor::execute: quota exhausted, opening cooldown"
                );
                self.gate.pause_for(window);
                return RequestOutcome::Retriable {
                    status: Some(status),
                    retry_after: Some(window),
                    quota: true,
                    detail,
                };
            }

            if self.profile.is_retriable(status) {
                // A hostile or malformed hint (negative, NaN, inf) is
                // discarded rather than fed to Duration
                let hint = response
                    .header(&self.profile.retry_after_header)
                    .and_then(|v| v.parse::<f64>().ok())
                    .filter(|secs| secs.is_finite() && *secs >= 0.0)
                    .map(Duration::from_secs_f64);

                last_outcome = RequestOutcome::Retriable {
                    status: Some(status),
                    retry_after: hint,
                    quota: false,
                    detail: detail.clone(),
                };

                if attempt < self.config.max_attempts {
                    let delay = self.retry_delay(hint, attempt);
                    warn!(
                        provider = %self.profile.name,
                        label = %descriptor.label,
                        status,
                        attempt,
                        max = self.config.max_attempts,
                        delay_secs = delay.as_secs(),
                        %detail,
                        "RequestExecutor::execute: retriable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                continue;
            }

            // Terminal: will not succeed on retry, surface immediately
            warn!(
                provider = %self.profile.name,
                label = %descriptor.label,
                status,
                %detail,
                "RequestExecutor::execute: terminal failure"
            );
            return RequestOutcome::Terminal { status, detail };
        }

        debug!(provider = %self.profile.name, label = %descriptor.label, "RequestExecutor::execute: attempts exhausted");
        last_outcome
    }

    /// Delay before the next attempt: the server hint when present, otherwise
    /// exponential backoff with jitter. Always at least one second.
    fn retry_delay(&self, hint: Option<Duration>, attempt: u32) -> Duration {
        if let Some(hint) = hint {
            return hint.max(MIN_RETRY_DELAY);
        }
        compute_backoff(
            self.config.backoff_base_ms,
            self.config.backoff_factor,
            self.config.jitter_ms,
            attempt,
        )
    }
}

/// Exponential backoff with uniform symmetric jitter, floored at one second.
///
/// The jitter exists to desynchronize many concurrent jobs that fail at the
/// same moment.
pub fn compute_backoff(base_ms: u64, factor: f64, jitter_ms: u64, attempt: u32) -> Duration {
    let mut delay_ms = base_ms as f64 * factor.powi(attempt.saturating_sub(1) as i32);
    if jitter_ms > 0 {
        let jitter = jitter_ms as f64;
        delay_ms += rand::rng().random_range(-jitter..=jitter);
    }
    Duration::from_millis(delay_ms.max(0.0) as u64).max(MIN_RETRY_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::descriptor::RawResponse;
    use crate::executor::profile::QuotaSignal;
    use crate::executor::transport::TransportFault;

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use proptest::prelude::*;
    use tokio::time::Instant;

    /// Transport that replays a fixed script of responses
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<RawResponse, TransportFault>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<RawResponse, TransportFault>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, _descriptor: &RequestDescriptor) -> Result<RawResponse, TransportFault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted transport ran out of responses")
        }
    }

    fn response(status: u16, body: &str) -> Result<RawResponse, TransportFault> {
        Ok(RawResponse {
            status,
            headers: HashMap::new(),
            body: body.to_string(),
        })
    }

    fn response_with_retry_after(status: u16, seconds: &str) -> Result<RawResponse, TransportFault> {
        let mut headers = HashMap::new();
        headers.insert("retry-after".to_string(), seconds.to_string());
        Ok(RawResponse {
            status,
            headers,
            body: String::new(),
        })
    }

    fn fault(cause: &str) -> Result<RawResponse, TransportFault> {
        Err(TransportFault {
            cause: cause.to_string(),
            timed_out: false,
        })
    }

    fn executor(transport: Arc<ScriptedTransport>, profile: ProviderProfile) -> RequestExecutor {
        RequestExecutor::new(
            transport,
            profile,
            CooldownGate::new(),
            ExecutorConfig {
                max_attempts: 3,
                backoff_base_ms: 1_000,
                backoff_factor: 2.0,
                jitter_ms: 0,
                cooldown_window_secs: 900,
                call_timeout_ms: 60_000,
            },
        )
    }

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor::get("https://api.example.com/items").label("GET items")
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_single_attempt() {
        let transport = ScriptedTransport::new(vec![response(400, r#"{"error": {"message": "bad request"}}"#)]);
        let exec = executor(transport.clone(), ProviderProfile::default());

        let outcome = exec.execute(&descriptor()).await;

        assert!(matches!(outcome, RequestOutcome::Terminal { status: 400, .. }));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retriable_exhausts_all_attempts() {
        let transport = ScriptedTransport::new(vec![response(503, ""), response(503, ""), response(503, "")]);
        let exec = executor(transport.clone(), ProviderProfile::default());

        let outcome = exec.execute(&descriptor()).await;

        assert!(matches!(outcome, RequestOutcome::Retriable { status: Some(503), .. }));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_second_attempt() {
        let transport = ScriptedTransport::new(vec![response(503, ""), response(200, r#"{"ok": true}"#)]);
        let exec = executor(transport.clone(), ProviderProfile::default());

        let outcome = exec.execute(&descriptor()).await;

        assert!(outcome.is_success());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_counts_as_attempt() {
        let transport = ScriptedTransport::new(vec![fault("connection reset"), response(200, "{}")]);
        let exec = executor(transport.clone(), ProviderProfile::default());

        let outcome = exec.execute(&descriptor()).await;

        assert!(outcome.is_success());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_surfaced_after_exhaustion() {
        let transport = ScriptedTransport::new(vec![fault("reset"), fault("reset"), fault("reset")]);
        let exec = executor(transport.clone(), ProviderProfile::default());

        let outcome = exec.execute(&descriptor()).await;

        assert!(matches!(outcome, RequestOutcome::Transport { .. }));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_header_honored() {
        let transport = ScriptedTransport::new(vec![response_with_retry_after(429, "30"), response(200, "{}")]);
        let exec = executor(transport.clone(), ProviderProfile::default());

        let started = Instant::now();
        let outcome = exec.execute(&descriptor()).await;

        assert!(outcome.is_success());
        // Next attempt scheduled no earlier than the server-specified delay
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_retry_after_falls_back_to_backoff() {
        // Negative, non-finite or non-numeric hints must not be trusted (and
        // must not crash the worker); the executor backs off as if no hint
        // arrived
        for value in ["-5", "NaN", "inf", "-inf", "soon"] {
            let transport = ScriptedTransport::new(vec![response_with_retry_after(503, value), response(200, "{}")]);
            let exec = executor(transport.clone(), ProviderProfile::default());

            let started = Instant::now();
            let outcome = exec.execute(&descriptor()).await;

            assert!(outcome.is_success(), "hint {value:?} should retry normally");
            assert_eq!(transport.calls(), 2);
            // Computed backoff applies, not the bogus hint
            assert!(started.elapsed() >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_signal_opens_cooldown() {
        let quota_body = r#"{"error": {"message": "quota", "type": "insufficient_quota", "code": "insufficient_quota"}}"#;
        let transport = ScriptedTransport::new(vec![response(429, quota_body)]);
        let exec = executor(
            transport.clone(),
            ProviderProfile::named("assistant").with_quota(QuotaSignal::default()),
        );

        let outcome = exec.execute(&descriptor()).await;

        assert!(matches!(outcome, RequestOutcome::Retriable { quota: true, .. }));
        assert!(exec.gate().is_paused());
        assert_eq!(transport.calls(), 1);

        // Subsequent calls are suppressed without network dispatch
        let outcome = exec.execute(&descriptor()).await;
        assert!(matches!(outcome, RequestOutcome::Retriable { quota: false, .. }));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_expiry_resumes_dispatch() {
        let quota_body = r#"{"error": {"code": "insufficient_quota"}}"#;
        let transport = ScriptedTransport::new(vec![response(429, quota_body), response(200, "{}")]);
        let exec = executor(
            transport.clone(),
            ProviderProfile::named("assistant").with_quota(QuotaSignal::default()),
        );

        let _ = exec.execute(&descriptor()).await;
        assert_eq!(transport.calls(), 1);

        tokio::time::advance(Duration::from_secs(901)).await;

        let outcome = exec.execute(&descriptor()).await;
        assert!(outcome.is_success());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generic_rate_limit_is_not_quota() {
        // 429 without the quota signature retries normally, gate stays open
        let transport = ScriptedTransport::new(vec![response(429, ""), response(200, "{}")]);
        let exec = executor(
            transport.clone(),
            ProviderProfile::named("assistant").with_quota(QuotaSignal::default()),
        );

        let outcome = exec.execute(&descriptor()).await;

        assert!(outcome.is_success());
        assert!(!exec.gate().is_paused());
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn test_backoff_floor() {
        // Tiny base still yields the one second floor
        let delay = compute_backoff(10, 2.0, 0, 1);
        assert_eq!(delay, Duration::from_secs(1));
    }

    proptest! {
        #[test]
        fn prop_backoff_within_bounds(
            base_ms in 1_000u64..60_000,
            factor in 1.0f64..4.0,
            jitter_ms in 0u64..10_000,
            attempt in 1u32..6,
        ) {
            let delay = compute_backoff(base_ms, factor, jitter_ms, attempt);
            let nominal = base_ms as f64 * factor.powi((attempt - 1) as i32);
            let upper = Duration::from_millis((nominal + jitter_ms as f64).ceil() as u64);

            prop_assert!(delay >= MIN_RETRY_DELAY);
            prop_assert!(delay <= upper.max(MIN_RETRY_DELAY));
        }
    }
}
