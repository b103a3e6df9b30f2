//! replyd - Marketplace review autoresponder daemon
//!
//! A long-running daemon that periodically services a roster of client
//! accounts: for each enabled client it fetches unanswered marketplace
//! feedbacks and questions, composes replies with an LLM assistant, publishes
//! them, and records the answered rows.
//!
//! # Core Concepts
//!
//! - **Dedup scheduling**: at most one execution per job key at any instant,
//!   enforced by an in-flight registry checked atomically at submission
//! - **Resilient calls**: every outbound request goes through a retrying
//!   executor with exponential backoff and a shared rate-limit cooldown gate
//! - **Failure isolation**: a failed call fails an attempt, a failed attempt
//!   may fail a job cycle, and nothing terminates the process
//!
//! # Modules
//!
//! - [`scheduler`] - tick loop, in-flight registry, bounded worker pool
//! - [`runner`] - per-job retry wrapper with operator notification
//! - [`executor`] - resilient request executor and cooldown gate
//! - [`pager`] - cursor-paged collection walker
//! - [`marketplace`] - typed client for the review platform
//! - [`assistant`] - reply-composition client
//! - [`responder`] - the autoresponder job itself

pub mod assistant;
pub mod config;
pub mod error;
pub mod executor;
pub mod marketplace;
pub mod notify;
pub mod pager;
pub mod responder;
pub mod roster;
pub mod runner;
pub mod scheduler;

// Re-export commonly used types
pub use assistant::{AssistantClient, AssistantConfig};
pub use config::Config;
pub use error::{ProviderError, RosterError};
pub use executor::{
    CooldownGate, ExecutorConfig, HttpTransport, ProviderProfile, QuotaSignal, RequestDescriptor, RequestExecutor,
    RequestOutcome, Transport,
};
pub use marketplace::{MarketplaceClient, MarketplaceConfig};
pub use notify::{Notifier, NullNotifier, TelegramNotifier};
pub use pager::{CursorPos, Page, PageCursor, PagedResult, drain_pages};
pub use responder::{AutoresponderJob, LogSink, ResponderConfig, ResultsSink};
pub use roster::{FileRoster, JobDescriptor, JobKind, RosterSource};
pub use runner::{JobHandler, JobRunner, RunOutcome, RunnerConfig};
pub use scheduler::{InFlightRegistry, Scheduler, SchedulerConfig};
