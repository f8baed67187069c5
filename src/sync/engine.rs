//! Push/pull engine for one bucket/root pairing

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};

use super::compare::{compare, ComparisonCounts, ComparisonResult};
use super::store::ObjectStore;
use super::{SyncDirection, SyncOptions, SyncReport};
use crate::cache::HashCache;
use crate::error::{Result, SyncError};
use crate::revision::{is_revision, next_free_revision, next_revision, LOCAL_TAG, REMOTE_TAG};
use crate::tree::{list_tree, resolve_key, PARTIAL_SUFFIX};

/// A remote container bound to a local root for the lifetime of a session
///
/// Holds no sync state of its own: every call recomputes the comparison
/// from the live listing and the local tree.
pub struct RemoteBucket {
    store: Arc<dyn ObjectStore>,
    container: String,
    local_root: PathBuf,
    cache: Option<Arc<HashCache>>,
}

/// One pass-1 step: delete `path`, optionally preserving it as `revision` first
struct Supersede {
    path: String,
    revision: Option<String>,
}

impl RemoteBucket {
    /// Bind `container` to `local_root`, creating both if absent
    pub async fn bind(
        store: Arc<dyn ObjectStore>,
        container: impl Into<String>,
        local_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        let container = container.into();
        let local_root = local_root.into();

        tokio::fs::create_dir_all(&local_root).await?;

        store
            .ensure_container(&container)
            .await
            .map_err(|e| SyncError::ContainerUnavailable {
                container: container.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            "Bound bucket {} to {}",
            container,
            local_root.display()
        );

        Ok(Self {
            store,
            container,
            local_root,
            cache: None,
        })
    }

    /// Bind using an S3 client built from `config`
    #[cfg(feature = "cloud")]
    pub async fn from_config(config: &crate::config::SyncConfig) -> Result<Self> {
        config.validate()?;
        let store = super::S3Store::from_config(config).await?;
        let bucket = Self::bind(Arc::new(store), config.bucket.clone(), config.local_root_path())
            .await?;

        Ok(if config.hash_cache {
            bucket.with_hash_cache()
        } else {
            bucket
        })
    }

    /// Reuse local digests across comparisons while mtime and size are unchanged
    pub fn with_hash_cache(mut self) -> Self {
        self.cache = Some(Arc::new(HashCache::new()));
        self
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn hash_cache(&self) -> Option<&HashCache> {
        self.cache.as_deref()
    }

    /// Classify every local and remote path
    pub async fn compare(&self) -> Result<ComparisonResult> {
        let listing = self.store.list_objects(&self.container).await?;
        let root = self.local_root.clone();
        let cache = self.cache.clone();

        tokio::task::spawn_blocking(move || {
            let local = list_tree(&root)?;
            compare(&listing, &local, &root, cache.as_deref())
        })
        .await
        .map_err(|e| SyncError::Io(std::io::Error::other(e)))?
    }

    /// Per-class counts without mutating either side
    pub async fn status(&self) -> Result<ComparisonCounts> {
        Ok(self.compare().await?.counts())
    }

    /// Make the container match the local tree
    ///
    /// Pass 1 revisions (safe mode) and deletes every remote object that is
    /// about to be superseded or orphaned. Pass 2 uploads every local file
    /// missing or different remotely. Files already matching are untouched.
    pub async fn push(&self, options: SyncOptions) -> Result<SyncReport> {
        let mut report = SyncReport::new(SyncDirection::Push, Utc::now());
        let state = self.compare().await?;
        report.unchanged = state.hash_same.len();

        // Keys that pass 2 will write must never be chosen as revision targets
        let mut claimed: HashSet<String> = state.local_only.iter().cloned().collect();
        let mut plan = Vec::new();

        for path in state.hash_different.union(&state.remote_only) {
            if !options.safe {
                plan.push(Supersede {
                    path: path.clone(),
                    revision: None,
                });
                continue;
            }
            if state.remote_only.contains(path) && is_revision(path, REMOTE_TAG) {
                report.kept_revisions += 1;
                continue;
            }
            let revision = self.free_remote_revision(path, &mut claimed).await?;
            plan.push(Supersede {
                path: path.clone(),
                revision: Some(revision),
            });
        }

        let concurrency = options.concurrency.max(1);
        let store = &self.store;
        let container = self.container.as_str();

        let superseded: Vec<Supersede> = stream::iter(plan.into_iter().map(|step| async move {
            if let Some(revision) = &step.revision {
                store.copy_object(container, &step.path, revision).await?;
                tracing::info!(
                    "Preserved s3://{}/{} as {}",
                    container,
                    step.path,
                    revision
                );
            } else {
                tracing::warn!(
                    "Discarding s3://{}/{} (safe mode off)",
                    container,
                    step.path
                );
            }
            store.delete_object(container, &step.path).await?;
            Ok::<_, SyncError>(step)
        }))
        .buffer_unordered(concurrency)
        .try_collect()
        .await?;

        record_superseded(&mut report, superseded);

        let uploads: BTreeSet<&String> = state.local_only.union(&state.hash_different).collect();
        let root = self.local_root.as_path();

        let uploaded: Vec<(String, u64)> = stream::iter(uploads.into_iter().map(|path| async move {
            let full_path = resolve_key(root, path)?;
            let data = tokio::fs::read(&full_path)
                .await
                .map_err(|e| SyncError::from_io(&full_path, e))?;
            let size = data.len() as u64;
            store.put_object(container, path, data).await?;
            tracing::info!("Uploaded {} ({} bytes) to s3://{}", path, size, container);
            Ok::<_, SyncError>((path.clone(), size))
        }))
        .buffer_unordered(concurrency)
        .try_collect()
        .await?;

        record_transferred(&mut report, uploaded);
        report.completed_at = Utc::now();

        tracing::info!(
            "Pushed {} to s3://{}: {} uploaded, {} revisioned, {} deleted, {} unchanged in {:?}",
            self.local_root.display(),
            self.container,
            report.transferred.len(),
            report.revisioned.len(),
            report.deleted.len(),
            report.unchanged,
            report.completed_at - report.started_at
        );
        Ok(report)
    }

    /// Make the local tree match the container
    ///
    /// Mirror of [`push`](Self::push): pass 1 revisions (safe mode) and
    /// removes local files about to be superseded or orphaned, pass 2
    /// downloads every object missing or different locally.
    pub async fn pull(&self, options: SyncOptions) -> Result<SyncReport> {
        let mut report = SyncReport::new(SyncDirection::Pull, Utc::now());
        let state = self.compare().await?;
        report.unchanged = state.hash_same.len();

        // Refuse keys that would land outside the root before touching anything
        let downloads: Vec<(String, PathBuf)> = state
            .remote_only
            .union(&state.hash_different)
            .map(|key| Ok((key.clone(), resolve_key(&self.local_root, key)?)))
            .collect::<Result<_>>()?;

        // A download cannot replace a directory that still holds files after
        // pass 1 or that other downloads will populate
        let mut survivors = vec![&state.hash_same, &state.hash_different, &state.remote_only];
        if options.safe {
            survivors.push(&state.local_only);
        }
        for (key, _) in &downloads {
            if survivors.iter().any(|paths| has_descendant(paths, key)) {
                return Err(SyncError::InvalidPath(format!(
                    "{} would replace a local directory that still holds files",
                    key
                )));
            }
        }

        let root = self.local_root.as_path();
        let mut claimed: HashSet<String> = state.remote_only.iter().cloned().collect();
        let mut plan = Vec::new();

        for path in state.hash_different.union(&state.local_only) {
            if !options.safe {
                plan.push(Supersede {
                    path: path.clone(),
                    revision: None,
                });
                continue;
            }
            if state.local_only.contains(path) && is_revision(path, LOCAL_TAG) {
                report.kept_revisions += 1;
                continue;
            }
            let revision = next_free_revision(path, LOCAL_TAG, &mut claimed, |candidate| {
                resolve_key(root, candidate)
                    .map(|p| p.exists())
                    .unwrap_or(true)
            });
            plan.push(Supersede {
                path: path.clone(),
                revision: Some(revision),
            });
        }

        let concurrency = options.concurrency.max(1);
        let cache = self.cache.as_deref();

        let superseded: Vec<Supersede> = stream::iter(plan.into_iter().map(|step| async move {
            let full_path = resolve_key(root, &step.path)?;
            if let Some(revision) = &step.revision {
                let target = resolve_key(root, revision)?;
                tokio::fs::copy(&full_path, &target)
                    .await
                    .map_err(|e| SyncError::from_io(&full_path, e))?;
                tracing::info!("Preserved {} as {}", step.path, revision);
            } else {
                tracing::warn!("Discarding local {} (safe mode off)", step.path);
            }
            tokio::fs::remove_file(&full_path)
                .await
                .map_err(|e| SyncError::from_io(&full_path, e))?;
            if let Some(cache) = cache {
                cache.invalidate(&full_path);
            }
            Ok::<_, SyncError>(step)
        }))
        .buffer_unordered(concurrency)
        .try_collect()
        .await?;

        prune_empty_parents(root, &superseded).await;
        record_superseded(&mut report, superseded);

        let store = &self.store;
        let container = self.container.as_str();

        let downloaded: Vec<(String, u64)> =
            stream::iter(downloads.into_iter().map(|(key, full_path)| async move {
                let data = store.get_object(container, &key).await?;
                let size = data.len() as u64;
                write_file(&full_path, &data).await?;
                tracing::info!("Downloaded {} ({} bytes) from s3://{}", key, size, container);
                Ok::<_, SyncError>((key, size))
            }))
            .buffer_unordered(concurrency)
            .try_collect()
            .await?;

        record_transferred(&mut report, downloaded);
        report.completed_at = Utc::now();

        tracing::info!(
            "Pulled s3://{} to {}: {} downloaded, {} revisioned, {} deleted, {} unchanged in {:?}",
            self.container,
            self.local_root.display(),
            report.transferred.len(),
            report.revisioned.len(),
            report.deleted.len(),
            report.unchanged,
            report.completed_at - report.started_at
        );
        Ok(report)
    }

    async fn free_remote_revision(
        &self,
        path: &str,
        claimed: &mut HashSet<String>,
    ) -> Result<String> {
        let mut candidate = next_revision(path, REMOTE_TAG);
        while claimed.contains(&candidate)
            || self.store.object_exists(&self.container, &candidate).await?
        {
            candidate = next_revision(&candidate, REMOTE_TAG);
        }
        claimed.insert(candidate.clone());
        Ok(candidate)
    }
}

/// Write `data` to `path` through a sibling temp file and a rename
async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| SyncError::InvalidPath(path.display().to_string()))?;
    tokio::fs::create_dir_all(parent).await?;

    let file_name = path
        .file_name()
        .ok_or_else(|| SyncError::InvalidPath(path.display().to_string()))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(PARTIAL_SUFFIX);
    let tmp_path = parent.join(tmp_name);

    if let Err(e) = tokio::fs::write(&tmp_path, data).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(SyncError::from_io(&tmp_path, e));
    }
    if let Err(e) = replace_with(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(SyncError::from_io(path, e));
    }
    Ok(())
}

/// Move `staged` onto `path`; an empty directory at `path` is removed first
async fn replace_with(staged: &Path, path: &Path) -> std::io::Result<()> {
    if tokio::fs::symlink_metadata(path)
        .await
        .is_ok_and(|meta| meta.is_dir())
    {
        tokio::fs::remove_dir(path).await?;
    }
    tokio::fs::rename(staged, path).await
}

/// Remove directories emptied by pass 1, walking up to (never including) `root`
async fn prune_empty_parents(root: &Path, removed: &[Supersede]) {
    for step in removed {
        let Ok(path) = resolve_key(root, &step.path) else {
            continue;
        };
        let mut dir = path.parent();
        while let Some(current) = dir {
            if current == root || tokio::fs::remove_dir(current).await.is_err() {
                break;
            }
            tracing::debug!("Removed empty directory {}", current.display());
            dir = current.parent();
        }
    }
}

/// Whether any of `paths` lives under `key` taken as a directory
fn has_descendant(paths: &BTreeSet<String>, key: &str) -> bool {
    let prefix = format!("{}/", key);
    paths
        .range(prefix.clone()..)
        .next()
        .is_some_and(|path| path.starts_with(&prefix))
}

fn record_superseded(report: &mut SyncReport, mut steps: Vec<Supersede>) {
    steps.sort_by(|a, b| a.path.cmp(&b.path));
    for step in steps {
        if let Some(revision) = step.revision {
            report.revisioned.push((step.path.clone(), revision));
        }
        report.deleted.push(step.path);
    }
}

fn record_transferred(report: &mut SyncReport, mut transferred: Vec<(String, u64)>) {
    transferred.sort();
    for (path, size) in transferred {
        report.bytes_transferred += size;
        report.transferred.push(path);
    }
}
