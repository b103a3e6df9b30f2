//! Recurring concurrent job scheduling
//!
//! [`Scheduler`] ticks on a fixed period, loads the roster, and submits each
//! enabled job that is not already in flight to a bounded worker pool.
//! [`InFlightRegistry`] holds the dedup invariant: at most one execution per
//! job key at any instant.

mod config;
mod core;
mod registry;

pub use config::SchedulerConfig;
pub use core::Scheduler;
pub use registry::InFlightRegistry;
