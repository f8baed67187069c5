//! Object store abstraction
//!
//! The sync engine only talks to remote storage through [`ObjectStore`],
//! so the S3 backend can be swapped for [`MemoryStore`](super::MemoryStore)
//! in tests or dry runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One entry of a container listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key, a `/`-separated relative path
    pub key: String,
    /// Opaque content fingerprint (an ETag for S3), possibly quoted
    pub integrity_tag: String,
    /// Object size in bytes
    pub size: u64,
    /// Last modification time, if the store reports one
    pub last_modified: Option<DateTime<Utc>>,
}

/// Remote object storage operations used by the sync engine
///
/// Implementations must not retry internally; failures are reported as
/// [`SyncError::Remote`](crate::SyncError::Remote) (or `NotFound` for a
/// missing key) and propagate to the caller.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the container if it does not exist yet
    async fn ensure_container(&self, container: &str) -> Result<()>;

    /// List every object in the container
    async fn list_objects(&self, container: &str) -> Result<Vec<ObjectInfo>>;

    /// Check whether `key` exists
    async fn object_exists(&self, container: &str, key: &str) -> Result<bool>;

    /// Fetch the full contents of `key`
    async fn get_object(&self, container: &str, key: &str) -> Result<Vec<u8>>;

    /// Store `body` under `key`, replacing any existing object
    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    async fn delete_object(&self, container: &str, key: &str) -> Result<()>;

    /// Server-side copy of `src_key` to `dst_key` within one container
    async fn copy_object(&self, container: &str, src_key: &str, dst_key: &str) -> Result<()>;
}
