//! Assignment files live in two places: a row in `assignment_files` and a blob
//! in object storage. The coordinator keeps them in step.
//!
//! Deletion removes the row inside a transaction, deletes the blob while that
//! transaction is still open, and rolls the row back if the blob delete fails.
//! The row lock is held for the length of the storage call, which is bounded by
//! `STORAGE_DELETE_TIMEOUT_SECONDS`. A timed out delete may still have been
//! applied, so the blob is looked up before deciding between commit and
//! rollback.

mod store;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use uuid::Uuid;

use crate::core::config::StorageSettings;
use crate::core::time::primitive_now_utc;
use crate::db::models::AssignmentFile;
use crate::repositories::{assignment_files::CreateAssignmentFile, RepositoryError};
use crate::services::storage::{DeleteError, ObjectStorage, UploadError};

pub use store::{
    AssignmentFileStore, AssignmentFileTransaction, PgAssignmentFileStore,
    PgAssignmentFileTransaction,
};

#[derive(Debug)]
pub enum DeleteOutcome {
    /// Row committed as deleted and the blob delete returned success.
    Deleted(AssignmentFile),
    NotFound,
    /// The blob delete failed and the row deletion was rolled back. Safe to
    /// retry. Both exist, unless the delete timed out and the follow-up lookup
    /// could not tell; that case is logged and left to the reconciliation sweep.
    StorageFailure(DeleteError),
}

#[derive(Debug, Error)]
pub enum AssignmentFileError {
    #[error("invalid upload: {0}")]
    Validation(String),
    #[error("assignment {0} not found")]
    AssignmentNotFound(i64),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("assignment file persistence failed: {0}")]
    Persistence(#[from] RepositoryError),
    #[error("blob {path} was deleted but removing record {file_id} failed to commit: {source}")]
    CommitAfterBlobDelete {
        file_id: i64,
        path: String,
        #[source]
        source: RepositoryError,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FileLimits {
    pub max_upload_bytes: u64,
    pub upload_timeout: Duration,
    pub delete_timeout: Duration,
}

impl FileLimits {
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            max_upload_bytes: settings.max_upload_bytes(),
            upload_timeout: settings.upload_timeout(),
            delete_timeout: settings.delete_timeout(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUpload {
    pub assignment_id: i64,
    pub name: String,
    pub bytes: Vec<u8>,
}

pub struct AssignmentFileService<S> {
    store: S,
    storage: Arc<dyn ObjectStorage>,
    limits: FileLimits,
}

impl<S: AssignmentFileStore> AssignmentFileService<S> {
    pub fn new(store: S, storage: Arc<dyn ObjectStorage>, limits: FileLimits) -> Self {
        Self { store, storage, limits }
    }

    pub async fn find(&self, file_id: i64) -> Result<Option<AssignmentFile>, AssignmentFileError> {
        Ok(self.store.find(file_id).await?)
    }

    pub async fn list_for_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<AssignmentFile>, AssignmentFileError> {
        Ok(self.store.list_for_assignment(assignment_id).await?)
    }

    /// Validates before anything reaches storage, then uploads, then records the
    /// file. If recording fails the uploaded blob is deleted again.
    pub async fn upload(&self, upload: NewUpload) -> Result<AssignmentFile, AssignmentFileError> {
        let NewUpload { assignment_id, name, bytes } = upload;
        let name = name.trim();

        if name.is_empty() {
            return Err(AssignmentFileError::Validation("file name is empty".to_string()));
        }
        if bytes.is_empty() {
            return Err(AssignmentFileError::Validation(format!("file {name} is empty")));
        }
        if bytes.len() as u64 > self.limits.max_upload_bytes {
            return Err(AssignmentFileError::Validation(format!(
                "file {name} exceeds {} bytes",
                self.limits.max_upload_bytes
            )));
        }

        let assignment = self
            .store
            .find_assignment(assignment_id)
            .await?
            .ok_or(AssignmentFileError::AssignmentNotFound(assignment_id))?;

        let path = format!(
            "assignments/{}/{}_{}",
            assignment.id,
            Uuid::new_v4().simple(),
            sanitized_filename(name)
        );

        let stored = match timeout(self.limits.upload_timeout, self.storage.upload(&path, bytes))
            .await
        {
            Ok(Ok(stored)) => stored,
            Ok(Err(err)) => {
                tracing::warn!(
                    assignment_id,
                    path = %path,
                    error = %err,
                    "Assignment file upload failed"
                );
                return Err(err.into());
            }
            Err(_) => {
                // The put may still land after we stop waiting.
                self.discard_blob(&path).await;
                return Err(UploadError::TimedOut {
                    path,
                    timeout: self.limits.upload_timeout,
                }
                .into());
            }
        };

        let params = CreateAssignmentFile {
            assignment_id: assignment.id,
            name,
            storage_path: &path,
            file_size: stored.size,
            content_sha256: &stored.sha256,
            created_at: primitive_now_utc(),
        };

        let file = match self.record(params).await {
            Ok(file) => file,
            Err(err) => {
                tracing::error!(
                    assignment_id,
                    path = %path,
                    error = %err,
                    "Failed to record uploaded assignment file"
                );
                self.discard_blob(&path).await;
                return Err(err.into());
            }
        };

        tracing::info!(
            file_id = file.id,
            assignment_id,
            assignment = %assignment.name,
            path = %file.storage_path,
            size = file.file_size,
            backend = self.storage.backend(),
            "Assignment file uploaded"
        );
        metrics::counter!("assignment_file_uploads_total").increment(1);

        Ok(file)
    }

    pub async fn delete(&self, file_id: i64) -> Result<DeleteOutcome, AssignmentFileError> {
        if self.store.find(file_id).await?.is_none() {
            tracing::warn!(file_id, "Assignment file not found for deletion");
            return Ok(DeleteOutcome::NotFound);
        }

        let mut tx = self.store.begin().await?;

        let file = match tx.destroy(file_id).await {
            Ok(Some(file)) => file,
            Ok(None) => {
                rollback_logged(tx).await;
                tracing::warn!(file_id, "Assignment file removed concurrently");
                return Ok(DeleteOutcome::NotFound);
            }
            Err(err) => {
                tracing::error!(file_id, error = %err, "Failed to destroy assignment file record");
                rollback_logged(tx).await;
                return Err(err.into());
            }
        };

        let path = file.storage_path.as_str();
        let deleted = match timeout(self.limits.delete_timeout, self.storage.delete(path)).await {
            Ok(result) => result,
            Err(_) => self.settle_timed_out_delete(file_id, path).await,
        };

        if let Err(err) = deleted {
            tracing::warn!(
                file_id,
                path,
                backend = self.storage.backend(),
                error = %err,
                "Blob delete failed; restoring assignment file record"
            );
            rollback_logged(tx).await;
            metrics::counter!("assignment_file_delete_rollbacks_total").increment(1);
            return Ok(DeleteOutcome::StorageFailure(err));
        }

        if let Err(source) = tx.commit().await {
            tracing::error!(
                file_id,
                path,
                error = %source,
                "Blob deleted but record deletion did not commit; record now points at a missing blob"
            );
            metrics::counter!("assignment_file_divergence_total").increment(1);
            return Err(AssignmentFileError::CommitAfterBlobDelete {
                file_id,
                path: path.to_string(),
                source,
            });
        }

        tracing::info!(
            file_id,
            assignment_id = file.assignment_id,
            path,
            "Assignment file deleted"
        );
        metrics::counter!("assignment_files_deleted_total").increment(1);

        Ok(DeleteOutcome::Deleted(file))
    }

    /// Decides the fate of a delete that did not answer in time by looking the
    /// blob up. `Ok` means the blob is gone and the row may be committed.
    async fn settle_timed_out_delete(&self, file_id: i64, path: &str) -> Result<(), DeleteError> {
        let timed_out =
            DeleteError::TimedOut { path: path.to_string(), timeout: self.limits.delete_timeout };

        match timeout(self.limits.delete_timeout, self.storage.exists(path)).await {
            Ok(Ok(false)) => {
                tracing::warn!(file_id, path, "Blob delete timed out but the blob is gone");
                Ok(())
            }
            Ok(Ok(true)) => Err(timed_out),
            Ok(Err(err)) => {
                tracing::error!(
                    file_id,
                    path,
                    error = %err,
                    "Blob delete timed out with unknown outcome; record may point at a missing blob"
                );
                metrics::counter!("assignment_file_divergence_total").increment(1);
                Err(timed_out)
            }
            Err(_) => {
                tracing::error!(
                    file_id,
                    path,
                    "Blob delete timed out with unknown outcome; record may point at a missing blob"
                );
                metrics::counter!("assignment_file_divergence_total").increment(1);
                Err(timed_out)
            }
        }
    }

    async fn record(
        &self,
        params: CreateAssignmentFile<'_>,
    ) -> Result<AssignmentFile, RepositoryError> {
        let mut tx = self.store.begin().await?;

        match tx.insert(params).await {
            Ok(file) => {
                tx.commit().await?;
                Ok(file)
            }
            Err(err) => {
                rollback_logged(tx).await;
                Err(err)
            }
        }
    }

    async fn discard_blob(&self, path: &str) {
        match timeout(self.limits.delete_timeout, self.storage.delete(path)).await {
            Ok(Ok(())) => {
                tracing::info!(path, "Removed blob of unrecorded assignment file");
            }
            Ok(Err(err)) => {
                tracing::error!(path, error = %err, "Failed to remove orphaned assignment blob");
                metrics::counter!("assignment_file_orphaned_blobs_total").increment(1);
            }
            Err(_) => {
                tracing::error!(path, "Timed out removing orphaned assignment blob");
                metrics::counter!("assignment_file_orphaned_blobs_total").increment(1);
            }
        }
    }
}

async fn rollback_logged<T: AssignmentFileTransaction>(tx: T) {
    if let Err(err) = tx.rollback().await {
        // The server aborts the transaction when the connection goes away.
        tracing::warn!(error = %err, "Explicit rollback failed");
    }
}

fn sanitized_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect();

    let sanitized = sanitized.trim_start_matches('.');
    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized.to_string()
    }
}
