//! Content digest cache keyed by (path, modification time, size)
//!
//! Rehashing every shared path dominates comparison cost on large trees.
//! An entry is only reused while the file's mtime and size are unchanged;
//! any change to either forces a rehash.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use dashmap::DashMap;

use crate::error::{Result, SyncError};
use crate::hash::hash_file;

/// Statistics for the hash cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that required reading the file
    pub misses: u64,
    /// Current number of entries
    pub entries: usize,
}

#[derive(Debug, Clone)]
struct CachedDigest {
    modified: SystemTime,
    size: u64,
    digest: String,
}

/// Thread-safe digest cache
#[derive(Debug, Default)]
pub struct HashCache {
    entries: DashMap<PathBuf, CachedDigest>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest of the file at `path`, reusing a cached value when the file's
    /// mtime and size still match
    pub fn digest(&self, path: &Path) -> Result<String> {
        let metadata = std::fs::metadata(path).map_err(|e| SyncError::from_io(path, e))?;
        let modified = metadata.modified()?;
        let size = metadata.len();

        if let Some(entry) = self.entries.get(path) {
            if entry.modified == modified && entry.size == size {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.digest.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let digest = hash_file(path)?;
        self.entries.insert(
            path.to_path_buf(),
            CachedDigest {
                modified,
                size,
                digest: digest.clone(),
            },
        );
        Ok(digest)
    }

    /// Drop the entry for `path`
    pub fn invalidate(&self, path: &Path) {
        self.entries.remove(path);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> HashCacheStats {
        HashCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
