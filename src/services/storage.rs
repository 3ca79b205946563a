//! Blob storage for assignment files.
//!
//! Callers receive an [`ObjectStorage`] at construction time; the backend is
//! chosen once from [`Settings`] by [`from_settings`].

mod local;
mod s3;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::config::Settings;

pub use local::LocalObjectStorage;
pub use s3::S3ObjectStorage;

/// What the backend stored for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub size: i64,
    pub sha256: String,
}

impl StoredObject {
    pub fn describe(bytes: &[u8]) -> Self {
        Self {
            size: bytes.len() as i64,
            sha256: hex::encode(Sha256::digest(bytes)),
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid storage path {0:?}")]
    InvalidPath(String),
    #[error("upload of {path} failed: {message}")]
    Failed { path: String, message: String },
    #[error("upload of {path} timed out after {timeout:?}")]
    TimedOut { path: String, timeout: Duration },
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("invalid storage path {0:?}")]
    InvalidPath(String),
    #[error("delete of {path} failed: {message}")]
    Failed { path: String, message: String },
    #[error("delete of {path} timed out after {timeout:?}")]
    TimedOut { path: String, timeout: Duration },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage path {0:?}")]
    InvalidPath(String),
    #[error("lookup of {path} failed: {message}")]
    Failed { path: String, message: String },
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Short backend label used in logs.
    fn backend(&self) -> &'static str;

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<StoredObject, UploadError>;

    /// Deleting a path that holds no object succeeds.
    async fn delete(&self, path: &str) -> Result<(), DeleteError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;
}

/// S3 when credentials are configured, otherwise the local filesystem under
/// `STORAGE_LOCAL_ROOT`.
pub async fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn ObjectStorage>> {
    if settings.s3().is_configured() {
        let storage = S3ObjectStorage::from_settings(settings).await;
        tracing::info!(bucket = %settings.s3().bucket, "Using S3 object storage");
        return Ok(Arc::new(storage));
    }

    let root = &settings.storage().local_root;
    let storage = LocalObjectStorage::create(root).await?;
    tracing::warn!(root = %root.display(), "S3 credentials missing; using local object storage");
    Ok(Arc::new(storage))
}
