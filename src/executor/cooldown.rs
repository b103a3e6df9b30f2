//! Process-wide cooldown gate for a rate-limited provider
//!
//! Once a provider signals quota exhaustion, every executor call against it
//! is preemptively failed until the pause deadline passes. The gate is shared
//! by all jobs targeting the provider; it is read before every dispatch and
//! written only when a quota signal is observed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Shared pause-until cell, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct CooldownGate {
    paused_until: Arc<Mutex<Option<Instant>>>,
}

impl CooldownGate {
    /// Create an open gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left until the gate reopens, if it is currently paused
    pub fn remaining(&self) -> Option<Duration> {
        let guard = self.paused_until.lock().expect("cooldown lock poisoned");
        let deadline = (*guard)?;
        let now = Instant::now();
        if deadline > now { Some(deadline - now) } else { None }
    }

    /// Check whether calls should be suppressed right now
    pub fn is_paused(&self) -> bool {
        self.remaining().is_some()
    }

    /// Pause traffic for the given window from now.
    ///
    /// The deadline only ever moves forward; a later signal from a concurrent
    /// call cannot shorten a pause already in place.
    pub fn pause_for(&self, window: Duration) {
        let deadline = Instant::now() + window;
        let mut guard = self.paused_until.lock().expect("cooldown lock poisoned");
        match *guard {
            Some(current) if current >= deadline => {
                debug!(?window, "CooldownGate::pause_for: existing pause is longer, keeping it");
            }
            _ => {
                warn!(?window, "CooldownGate::pause_for: pausing provider traffic");
                *guard = Some(deadline);
            }
        }
    }
}
