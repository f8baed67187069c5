//! bucket-sync - directory/bucket synchronization
//!
//! Push and pull a local directory tree to and from an S3-compatible
//! bucket, detecting divergence by content hash and preserving superseded
//! content under revisioned names.

pub mod cache;
pub mod config;
pub mod error;
pub mod hash;
pub mod logging;
pub mod revision;
pub mod sync;
pub mod tree;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use sync::{
    ComparisonResult, FileState, MemoryStore, ObjectInfo, ObjectStore, RemoteBucket,
    SyncDirection, SyncOptions, SyncReport,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
