//! In-flight job registry
//!
//! Maps job keys to running task handles. The dedup invariant lives here: a
//! key appears at most once, and the decide-absent / spawn / record-handle
//! sequence is a single critical section, so two ticks can never both submit
//! for the same key.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::task::JoinHandle;
use tracing::debug;

/// Mutex-protected map from job key to its running task
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    inner: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl InFlightRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check the key is absent, invoke `spawn`, and record the
    /// returned handle. Returns false (without spawning) when the key is
    /// already in flight.
    ///
    /// `spawn` runs under the registry lock and must not block or await.
    pub fn try_insert_with<F>(&self, key: &str, spawn: F) -> bool
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        if inner.contains_key(key) {
            debug!(%key, "InFlightRegistry::try_insert_with: key already in flight");
            return false;
        }
        inner.insert(key.to_string(), spawn());
        debug!(%key, in_flight = inner.len(), "InFlightRegistry::try_insert_with: inserted");
        true
    }

    /// Remove a key once its execution terminated. Returns whether it was
    /// present.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self
            .inner
            .lock()
            .expect("registry lock poisoned")
            .remove(key)
            .is_some();
        debug!(%key, removed, "InFlightRegistry::remove: called");
        removed
    }

    /// Drop entries whose task already finished. Defensive cleanup for the
    /// case where a completion callback was missed (e.g. a panicked task);
    /// returns how many entries were purged.
    pub fn purge_finished(&self) -> usize {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let before = inner.len();
        inner.retain(|_, handle| !handle.is_finished());
        before - inner.len()
    }

    /// Check whether a key is currently in flight
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().expect("registry lock poisoned").contains_key(key)
    }

    /// Number of in-flight entries
    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry lock poisoned").len()
    }

    /// Check whether nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
