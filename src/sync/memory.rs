//! In-process object store
//!
//! Behaves like a single-part S3 bucket: integrity tags are the quoted hex
//! MD5 of the object body. Supports failure injection for testing partial
//! syncs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::store::{ObjectInfo, ObjectStore};
use crate::error::{Result, SyncError};
use crate::hash::hash_bytes;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    etag: String,
    last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn new(data: Vec<u8>) -> Self {
        let etag = format!("\"{}\"", hash_bytes(&data));
        Self {
            data,
            etag,
            last_modified: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    containers: HashMap<String, BTreeMap<String, StoredObject>>,
    fail_ensure: Option<String>,
    fail_puts: HashSet<String>,
    fail_gets: HashSet<String>,
}

/// Object store held entirely in memory
///
/// Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

impl MemoryStore {
    /// Create an empty store with no containers
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly, creating the container if needed
    pub fn insert(&self, container: &str, key: &str, data: impl Into<Vec<u8>>) {
        let mut inner = self.inner.write();
        inner
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(key.to_string(), StoredObject::new(data.into()));
    }

    /// Read an object directly
    pub fn contents(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        let inner = self.inner.read();
        inner
            .containers
            .get(container)
            .and_then(|objects| objects.get(key))
            .map(|obj| obj.data.clone())
    }

    /// Sorted keys of a container (empty if the container does not exist)
    pub fn keys(&self, container: &str) -> Vec<String> {
        let inner = self.inner.read();
        inner
            .containers
            .get(container)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove an object directly, bypassing failure injection
    pub fn remove(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        let mut inner = self.inner.write();
        inner
            .containers
            .get_mut(container)
            .and_then(|objects| objects.remove(key))
            .map(|obj| obj.data)
    }

    /// Whether the container exists
    pub fn has_container(&self, container: &str) -> bool {
        self.inner.read().containers.contains_key(container)
    }

    /// Make every `ensure_container` call fail with the given reason
    pub fn fail_ensure(&self, reason: &str) {
        self.inner.write().fail_ensure = Some(reason.to_string());
    }

    /// Make every `put_object` for `key` fail
    pub fn fail_on_put(&self, key: &str) {
        self.inner.write().fail_puts.insert(key.to_string());
    }

    /// Make every `get_object` for `key` fail
    pub fn fail_on_get(&self, key: &str) {
        self.inner.write().fail_gets.insert(key.to_string());
    }

    /// Drop all injected failures
    pub fn clear_failures(&self) {
        let mut inner = self.inner.write();
        inner.fail_ensure = None;
        inner.fail_puts.clear();
        inner.fail_gets.clear();
    }
}

fn no_such_bucket(container: &str) -> SyncError {
    SyncError::Remote(format!("NoSuchBucket: {}", container))
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn ensure_container(&self, container: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(reason) = inner.fail_ensure.clone() {
            return Err(SyncError::Remote(reason));
        }
        inner.containers.entry(container.to_string()).or_default();
        Ok(())
    }

    async fn list_objects(&self, container: &str) -> Result<Vec<ObjectInfo>> {
        let inner = self.inner.read();
        let objects = inner
            .containers
            .get(container)
            .ok_or_else(|| no_such_bucket(container))?;

        Ok(objects
            .iter()
            .map(|(key, obj)| ObjectInfo {
                key: key.clone(),
                integrity_tag: obj.etag.clone(),
                size: obj.data.len() as u64,
                last_modified: Some(obj.last_modified),
            })
            .collect())
    }

    async fn object_exists(&self, container: &str, key: &str) -> Result<bool> {
        let inner = self.inner.read();
        let objects = inner
            .containers
            .get(container)
            .ok_or_else(|| no_such_bucket(container))?;
        Ok(objects.contains_key(key))
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let inner = self.inner.read();
        if inner.fail_gets.contains(key) {
            return Err(SyncError::Remote(format!("injected get failure: {}", key)));
        }
        let objects = inner
            .containers
            .get(container)
            .ok_or_else(|| no_such_bucket(container))?;
        objects
            .get(key)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| SyncError::NotFound(format!("{}/{}", container, key)))
    }

    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.fail_puts.contains(key) {
            return Err(SyncError::Remote(format!("injected put failure: {}", key)));
        }
        let objects = inner
            .containers
            .get_mut(container)
            .ok_or_else(|| no_such_bucket(container))?;
        objects.insert(key.to_string(), StoredObject::new(body));
        Ok(())
    }

    async fn delete_object(&self, container: &str, key: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let objects = inner
            .containers
            .get_mut(container)
            .ok_or_else(|| no_such_bucket(container))?;
        objects.remove(key);
        Ok(())
    }

    async fn copy_object(&self, container: &str, src_key: &str, dst_key: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let objects = inner
            .containers
            .get_mut(container)
            .ok_or_else(|| no_such_bucket(container))?;
        let source = objects
            .get(src_key)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("{}/{}", container, src_key)))?;
        objects.insert(
            dst_key.to_string(),
            StoredObject {
                last_modified: Utc::now(),
                ..source
            },
        );
        Ok(())
    }
}
