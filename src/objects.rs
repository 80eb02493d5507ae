//! Object storage for raw uploaded documents.
//!
//! Uploads live under `uploads/{upload_id}/{filename}`. The event handler
//! derives the upload identity from that key, so [`upload_key`] and
//! [`parse_upload_key`] must stay inverse to each other.

use crate::error::StoreError;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Top-level prefix of every upload key.
pub const UPLOAD_PREFIX: &str = "uploads";

/// Read and write raw bytes by bucket + key.
pub trait ObjectStore: Send + Sync {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    fn put_object(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Key for an upload's raw bytes.
pub fn upload_key(upload_id: &str, filename: &str) -> String {
    format!("{UPLOAD_PREFIX}/{upload_id}/{filename}")
}

/// Split `uploads/{upload_id}/{filename}` into its parts.
///
/// Returns `None` for any other shape, including empty segments and deeper
/// nesting.
pub fn parse_upload_key(key: &str) -> Option<(&str, &str)> {
    let mut parts = key.split('/');
    let (prefix, upload_id, filename) = (parts.next()?, parts.next()?, parts.next()?);
    if prefix != UPLOAD_PREFIX || upload_id.is_empty() || filename.is_empty() || parts.next().is_some() {
        return None;
    }
    Some((upload_id, filename))
}

/// Buckets are directories under a root; keys are relative paths inside them.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `bucket/key` under the root, rejecting anything that could
    /// escape it.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let mut path = self.root.clone();
        for part in [bucket, key] {
            let rel = Path::new(part);
            let safe = !part.is_empty()
                && rel
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
            if !safe {
                return Err(StoreError::InvalidKey {
                    key: format!("{bucket}/{key}"),
                });
            }
            path.push(rel);
        }
        Ok(path)
    }
}

impl ObjectStore for LocalObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(bucket, key)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            _ => StoreError::Io(e),
        })
    }

    fn put_object(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(())
    }
}
