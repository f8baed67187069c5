//! Local vs remote state classification

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::store::ObjectInfo;
use crate::cache::HashCache;
use crate::error::Result;
use crate::hash::{digest_matches, hash_file};
use crate::tree::{is_partial_name, resolve_key};

/// Class of a relative path relative to its remote counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// Present in the container only
    RemoteOnly,
    /// Present in the local tree only
    LocalOnly,
    /// Present on both sides with identical content
    HashSame,
    /// Present on both sides with different content
    HashDifferent,
}

impl FileState {
    pub const ALL: [FileState; 4] = [
        FileState::RemoteOnly,
        FileState::LocalOnly,
        FileState::HashSame,
        FileState::HashDifferent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::RemoteOnly => "remote_only",
            FileState::LocalOnly => "local_only",
            FileState::HashSame => "hash_same",
            FileState::HashDifferent => "hash_different",
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition of every known relative path into four disjoint classes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub remote_only: BTreeSet<String>,
    pub local_only: BTreeSet<String>,
    pub hash_same: BTreeSet<String>,
    pub hash_different: BTreeSet<String>,
}

/// Per-class counts of a [`ComparisonResult`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonCounts {
    pub remote_only: usize,
    pub local_only: usize,
    pub hash_same: usize,
    pub hash_different: usize,
}

impl ComparisonResult {
    /// Paths in the given class
    pub fn get(&self, state: FileState) -> &BTreeSet<String> {
        match state {
            FileState::RemoteOnly => &self.remote_only,
            FileState::LocalOnly => &self.local_only,
            FileState::HashSame => &self.hash_same,
            FileState::HashDifferent => &self.hash_different,
        }
    }

    fn get_mut(&mut self, state: FileState) -> &mut BTreeSet<String> {
        match state {
            FileState::RemoteOnly => &mut self.remote_only,
            FileState::LocalOnly => &mut self.local_only,
            FileState::HashSame => &mut self.hash_same,
            FileState::HashDifferent => &mut self.hash_different,
        }
    }

    /// Class of `path`, if it was seen on either side
    pub fn state_of(&self, path: &str) -> Option<FileState> {
        FileState::ALL
            .into_iter()
            .find(|state| self.get(*state).contains(path))
    }

    /// Union of all four classes
    pub fn all_paths(&self) -> BTreeSet<String> {
        FileState::ALL
            .iter()
            .flat_map(|state| self.get(*state).iter().cloned())
            .collect()
    }

    /// Total number of classified paths
    pub fn len(&self) -> usize {
        FileState::ALL.iter().map(|s| self.get(*s).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when every path exists on both sides with the same content
    pub fn is_in_sync(&self) -> bool {
        self.remote_only.is_empty() && self.local_only.is_empty() && self.hash_different.is_empty()
    }

    pub fn counts(&self) -> ComparisonCounts {
        ComparisonCounts {
            remote_only: self.remote_only.len(),
            local_only: self.local_only.len(),
            hash_same: self.hash_same.len(),
            hash_different: self.hash_different.len(),
        }
    }
}

impl fmt::Display for ComparisonCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} same, {} different, {} local only, {} remote only",
            self.hash_same, self.hash_different, self.local_only, self.remote_only
        )
    }
}

/// Classify every path in `remote_listing` and `local_paths`
///
/// Paths present on both sides are hashed from `local_root` (through
/// `cache` when given) and compared against the remote integrity tag.
/// Keys ending in `/` are directory placeholders and are skipped, as are
/// staged-download names.
pub fn compare(
    remote_listing: &[ObjectInfo],
    local_paths: &BTreeSet<String>,
    local_root: &Path,
    cache: Option<&HashCache>,
) -> Result<ComparisonResult> {
    let remote: HashMap<&str, &ObjectInfo> = remote_listing
        .iter()
        .filter(|obj| {
            !obj.key.is_empty() && !obj.key.ends_with('/') && !is_partial_name(&obj.key)
        })
        .map(|obj| (obj.key.as_str(), obj))
        .collect();

    let mut result = ComparisonResult::default();

    for path in local_paths {
        let state = match remote.get(path.as_str()) {
            None => FileState::LocalOnly,
            Some(obj) => {
                let full_path = resolve_key(local_root, path)?;
                let digest = match cache {
                    Some(cache) => cache.digest(&full_path)?,
                    None => hash_file(&full_path)?,
                };
                if digest_matches(&digest, &obj.integrity_tag) {
                    FileState::HashSame
                } else {
                    FileState::HashDifferent
                }
            }
        };
        tracing::debug!("{} -> {}", path, state);
        result.get_mut(state).insert(path.clone());
    }

    for key in remote.keys() {
        if !local_paths.contains(*key) {
            tracing::debug!("{} -> {}", key, FileState::RemoteOnly);
            result.remote_only.insert((*key).to_string());
        }
    }

    Ok(result)
}
