use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::{DeleteError, ObjectStorage, StorageError, StoredObject, UploadError};

/// Stores objects as plain files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
}

impl LocalObjectStorage {
    pub async fn create(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Only plain relative segments are accepted, so no key can leave the root.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        if path.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<StoredObject, UploadError> {
        let target = self.resolve(path).ok_or_else(|| UploadError::InvalidPath(path.to_string()))?;
        let failed = |err: std::io::Error| UploadError::Failed {
            path: path.to_string(),
            message: err.to_string(),
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(failed)?;
        }
        let object = StoredObject::describe(&bytes);
        tokio::fs::write(&target, bytes).await.map_err(failed)?;

        Ok(object)
    }

    async fn delete(&self, path: &str) -> Result<(), DeleteError> {
        let target = self.resolve(path).ok_or_else(|| DeleteError::InvalidPath(path.to_string()))?;

        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path, "Object already absent from local storage");
                Ok(())
            }
            Err(err) => {
                Err(DeleteError::Failed { path: path.to_string(), message: err.to_string() })
            }
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let target =
            self.resolve(path).ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;

        tokio::fs::try_exists(&target)
            .await
            .map_err(|err| StorageError::Failed { path: path.to_string(), message: err.to_string() })
    }
}
