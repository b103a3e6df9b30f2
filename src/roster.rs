//! Job roster: who to run, and where the list comes from
//!
//! The roster itself lives in an external tabular store; the scheduler only
//! reads it through the [`RosterSource`] seam. A YAML-backed implementation
//! is provided for deployments that sync the table to disk.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RosterError;

/// Job type discriminator.
///
/// Decided once when the roster row is read, never re-inspected downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Marketplace review/question autoresponder
    Autoresponder,
}

impl JobKind {
    /// Stable name used in job keys and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Autoresponder => "autoresponder",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One client job from the roster, immutable for the cycle.
///
/// `key` uniquely identifies the job across ticks; the dedup registry relies
/// on that uniqueness.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    key: String,
    /// Job type
    pub kind: JobKind,
    /// Display name of the client
    pub name: String,
    /// Opaque per-job credential for the downstream provider
    pub token: String,
    /// Opaque per-job target identifier (results destination)
    pub target: String,
    /// Whether the job should run this cycle
    pub enabled: bool,
}

impl JobDescriptor {
    /// Build a descriptor; the key is derived once, here
    pub fn new(
        kind: JobKind,
        name: impl Into<String>,
        token: impl Into<String>,
        target: impl Into<String>,
        enabled: bool,
    ) -> Self {
        let name = name.into();
        let target = target.into();
        Self {
            key: format!("{}/{}/{}", kind.as_str(), name, target),
            kind,
            name,
            token: token.into(),
            target,
            enabled,
        }
    }

    /// The unique job key
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Read access to the current job roster
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Load the current roster rows, in order
    async fn load(&self) -> Result<Vec<JobDescriptor>, RosterError>;
}

/// Row shape of the on-disk roster file
#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "type")]
    kind: JobKind,
    enabled: bool,
    name: String,
    token: String,
    target: String,
}

/// Roster backed by a YAML file on disk
pub struct FileRoster {
    path: PathBuf,
}

impl FileRoster {
    /// Create a roster reading from the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RosterSource for FileRoster {
    async fn load(&self) -> Result<Vec<JobDescriptor>, RosterError> {
        debug!(path = %self.path.display(), "FileRoster::load: called");
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| RosterError::Unavailable(format!("{}: {e}", self.path.display())))?;

        let rows: Vec<RosterRow> =
            serde_yaml::from_str(&content).map_err(|e| RosterError::Unavailable(e.to_string()))?;

        let jobs = rows
            .into_iter()
            .map(|row| JobDescriptor::new(row.kind, row.name, row.token, row.target, row.enabled))
            .collect::<Vec<_>>();

        debug!(count = jobs.len(), "FileRoster::load: loaded");
        Ok(jobs)
    }
}
