//! Resilient outbound request execution
//!
//! Every call to a downstream provider goes through [`RequestExecutor`]:
//! bounded retries, exponential backoff with jitter, server-supplied retry
//! delays, and a process-wide [`CooldownGate`] that suppresses traffic to a
//! provider that signalled quota exhaustion.

mod config;
mod cooldown;
mod core;
mod descriptor;
mod profile;
mod transport;

pub use config::ExecutorConfig;
pub use cooldown::CooldownGate;
pub use core::{RequestExecutor, compute_backoff};
pub use descriptor::{DEFAULT_CALL_TIMEOUT, Payload, RawResponse, RequestDescriptor, RequestOutcome, error_summary};
pub use profile::{ProviderProfile, QuotaSignal};
pub use transport::{HttpTransport, Transport, TransportFault};
