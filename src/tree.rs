//! Local tree listing

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, SyncError};

/// Suffix of the temp files downloads are staged in; such names are never synced
pub const PARTIAL_SUFFIX: &str = ".bucket-sync.partial";

/// Whether the last component of `key` is a staged download
pub fn is_partial_name(key: &str) -> bool {
    key.rsplit('/').next().unwrap_or(key).ends_with(PARTIAL_SUFFIX)
}

/// List every regular file under `root` as a `/`-separated path relative to `root`
///
/// A missing root yields an empty set. Directories are walked but not
/// listed; symlinks resolve the way the filesystem resolves them. Staged
/// downloads (names ending in [`PARTIAL_SUFFIX`]) are skipped.
pub fn list_tree(root: &Path) -> Result<BTreeSet<String>> {
    let mut paths = BTreeSet::new();

    if !root.exists() {
        return Ok(paths);
    }

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_default();
            match e.into_io_error() {
                Some(io) => SyncError::from_io(path, io),
                None => SyncError::Io(std::io::Error::other("filesystem loop")),
            }
        })?;

        if !entry.path().is_file() || is_partial_name(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| SyncError::InvalidPath(entry.path().display().to_string()))?;
        paths.insert(to_relative_key(relative)?);
    }

    Ok(paths)
}

/// Render a relative filesystem path as a `/`-separated key
pub fn to_relative_key(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| SyncError::InvalidPath(relative.display().to_string()))?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => return Err(SyncError::InvalidPath(relative.display().to_string())),
        }
    }
    Ok(parts.join("/"))
}

/// Resolve a `/`-separated key under `root`, refusing keys that could escape it
pub fn resolve_key(root: &Path, key: &str) -> Result<PathBuf> {
    if key.is_empty() || key.starts_with('/') || key.contains('\\') {
        return Err(SyncError::InvalidPath(key.to_string()));
    }

    let mut path = root.to_path_buf();
    for part in key.split('/') {
        match part {
            "" | "." | ".." => return Err(SyncError::InvalidPath(key.to_string())),
            _ => path.push(part),
        }
    }
    Ok(path)
}
