//! Sync configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Default number of concurrent per-file operations within one pass
pub const DEFAULT_CONCURRENCY: usize = 8;

pub const ENV_BUCKET: &str = "BUCKET_SYNC_BUCKET";
pub const ENV_LOCAL_ROOT: &str = "BUCKET_SYNC_LOCAL_ROOT";
pub const ENV_REGION: &str = "BUCKET_SYNC_REGION";
pub const ENV_ENDPOINT: &str = "BUCKET_SYNC_ENDPOINT";
pub const ENV_SAFE: &str = "BUCKET_SYNC_SAFE";
pub const ENV_CONCURRENCY: &str = "BUCKET_SYNC_CONCURRENCY";
pub const ENV_HASH_CACHE: &str = "BUCKET_SYNC_HASH_CACHE";

/// Configuration for one bucket/root pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote container (bucket) name
    pub bucket: String,
    /// Local root directory; `~` is expanded
    pub local_root: String,
    /// Region for bucket creation and requests
    pub region: Option<String>,
    /// Custom S3-compatible endpoint (R2, MinIO)
    pub endpoint_url: Option<String>,
    /// Preserve superseded content under revisioned names
    pub safe: bool,
    /// Concurrent per-file operations within one pass
    pub concurrency: usize,
    /// Reuse digests of files whose mtime and size are unchanged
    pub hash_cache: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            local_root: ".".to_string(),
            region: None,
            endpoint_url: None,
            safe: true,
            concurrency: DEFAULT_CONCURRENCY,
            hash_cache: false,
        }
    }
}

impl SyncConfig {
    /// Create a config for the given bucket and local root with defaults elsewhere
    pub fn new(bucket: impl Into<String>, local_root: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            local_root: local_root.into(),
            ..Default::default()
        }
    }

    /// Load configuration from `BUCKET_SYNC_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.bucket = lookup(ENV_BUCKET)
            .ok_or_else(|| SyncError::Config(format!("{} is not set", ENV_BUCKET)))?;
        if let Some(root) = lookup(ENV_LOCAL_ROOT) {
            config.local_root = root;
        }
        config.region = lookup(ENV_REGION).filter(|s| !s.is_empty());
        config.endpoint_url = lookup(ENV_ENDPOINT).filter(|s| !s.is_empty());
        if let Some(value) = lookup(ENV_SAFE) {
            config.safe = parse_bool(ENV_SAFE, &value)?;
        }
        if let Some(value) = lookup(ENV_CONCURRENCY) {
            config.concurrency = value.trim().parse().map_err(|_| {
                SyncError::Config(format!("{} must be a positive integer, got {:?}", ENV_CONCURRENCY, value))
            })?;
        }
        if let Some(value) = lookup(ENV_HASH_CACHE) {
            config.hash_cache = parse_bool(ENV_HASH_CACHE, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::from_io(path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot bind
    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(SyncError::Config("bucket must not be empty".to_string()));
        }
        if self.bucket.contains('/') {
            return Err(SyncError::Config(format!(
                "bucket name must not contain '/': {}",
                self.bucket
            )));
        }
        if self.local_root.trim().is_empty() {
            return Err(SyncError::Config("local_root must not be empty".to_string()));
        }
        Ok(())
    }

    /// Local root with `~` expanded
    pub fn local_root_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.local_root).to_string())
    }

    /// Concurrency clamped to at least one
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SyncError::Config(format!(
            "{} must be a boolean, got {:?}",
            name, value
        ))),
    }
}
