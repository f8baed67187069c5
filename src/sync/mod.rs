//! Directory/bucket synchronization
//!
//! Every push or pull recomputes a full [`ComparisonResult`] from the live
//! container listing and local tree, then applies two ordered passes:
//! first the side being overwritten is revisioned/cleared, then content is
//! transferred from the source of truth.
//!
//! # Feature Flags
//!
//! The S3 backend requires the `cloud` feature. The comparison logic, the
//! engine and [`MemoryStore`] are always available.

#[cfg(feature = "cloud")]
mod cloud;
mod compare;
mod engine;
mod memory;
mod store;

#[cfg(feature = "cloud")]
pub use cloud::S3Store;
pub use compare::{compare, ComparisonCounts, ComparisonResult, FileState};
pub use engine::RemoteBucket;
pub use memory::MemoryStore;
pub use store::{ObjectInfo, ObjectStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{SyncConfig, DEFAULT_CONCURRENCY};

/// Sync direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// Local tree is the source of truth
    Push,
    /// Container is the source of truth
    Pull,
}

/// Conflict policy and parallelism for one push/pull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Preserve superseded content under a revisioned name before deleting it
    pub safe: bool,
    /// Maximum concurrent per-file operations within one pass
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            safe: true,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl SyncOptions {
    /// Safe mode with default concurrency
    pub fn safe() -> Self {
        Self::default()
    }

    /// Destructive mode: superseded and orphaned files are deleted without a copy
    pub fn unsafe_mode() -> Self {
        Self {
            safe: false,
            ..Self::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            safe: config.safe,
            concurrency: config.effective_concurrency(),
        }
    }
}

/// Outcome of a completed push or pull
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// (original path, revisioned path) pairs preserved before deletion
    pub revisioned: Vec<(String, String)>,
    /// Original paths deleted from the overwritten side
    pub deleted: Vec<String>,
    /// Paths uploaded (push) or downloaded (pull)
    pub transferred: Vec<String>,
    pub bytes_transferred: u64,
    /// Paths that already matched and were left alone
    pub unchanged: usize,
    /// Earlier revisioned copies left in place by a safe sync
    pub kept_revisions: usize,
}

impl SyncReport {
    fn new(direction: SyncDirection, started_at: DateTime<Utc>) -> Self {
        Self {
            direction,
            started_at,
            completed_at: started_at,
            revisioned: Vec::new(),
            deleted: Vec::new(),
            transferred: Vec::new(),
            bytes_transferred: 0,
            unchanged: 0,
            kept_revisions: 0,
        }
    }

    /// Deleted paths whose content was not preserved anywhere
    pub fn discarded(&self) -> Vec<&str> {
        self.deleted
            .iter()
            .filter(|path| !self.revisioned.iter().any(|(orig, _)| orig == *path))
            .map(String::as_str)
            .collect()
    }

    /// True when the sync had nothing to do
    pub fn is_noop(&self) -> bool {
        self.revisioned.is_empty() && self.deleted.is_empty() && self.transferred.is_empty()
    }
}
