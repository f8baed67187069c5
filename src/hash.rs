//! Content hashing compatible with S3 single-part ETags
//!
//! S3 reports an object's ETag as the quoted hex MD5 of its bytes, e.g.
//! `"da86e4696de39679cdc5c2c1fd8dd79c"`. Multipart uploads produce a
//! different format (`<hex>-<parts>`) which never matches a plain digest,
//! so such objects always classify as changed.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};

use crate::error::{Result, SyncError};

/// Read buffer for streaming file digests
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Hex MD5 of an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Hex MD5 of the file at `path`
///
/// Fails with [`SyncError::NotFound`] when the file does not exist and
/// [`SyncError::Io`] when it cannot be read.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| SyncError::from_io(path, e))?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Strip surrounding quotes and whitespace from an integrity tag and lowercase it
pub fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_ascii_lowercase()
}

/// Compare a local hex digest against a store integrity tag
pub fn digest_matches(local_digest: &str, integrity_tag: &str) -> bool {
    normalize_tag(local_digest) == normalize_tag(integrity_tag)
}
