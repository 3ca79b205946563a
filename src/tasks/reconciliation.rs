//! Walks every assignment file record and checks that its blob still exists.
//! Records left pointing at a missing blob are reported, never repaired.

use std::time::Duration;

use anyhow::Result;
use tokio::time::timeout;

use crate::core::state::AppState;
use crate::db::models::AssignmentFile;
use crate::repositories;
use crate::services::storage::ObjectStorage;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub scanned: usize,
    pub missing: Vec<MissingBlob>,
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingBlob {
    pub file_id: i64,
    pub assignment_id: i64,
    pub storage_path: String,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.errors == 0
    }
}

pub async fn sweep(state: &AppState) -> Result<ReconciliationReport> {
    let batch_size = state.settings().reconciliation().batch_size;
    let probe_timeout = state.settings().storage().delete_timeout();
    let storage = state.storage().as_ref();
    let mut report = ReconciliationReport::default();
    let mut after_id = 0;

    loop {
        let batch =
            repositories::assignment_files::list_after(state.db(), after_id, batch_size).await?;
        let Some(last) = batch.last() else {
            break;
        };
        after_id = last.id;

        audit_batch(storage, probe_timeout, &batch, &mut report).await;

        if (batch.len() as i64) < batch_size {
            break;
        }
    }

    if report.is_clean() {
        tracing::info!(
            scanned = report.scanned,
            backend = storage.backend(),
            "Assignment file reconciliation clean"
        );
    } else {
        tracing::warn!(
            scanned = report.scanned,
            missing = report.missing.len(),
            errors = report.errors,
            backend = storage.backend(),
            "Assignment file reconciliation found problems"
        );
    }

    Ok(report)
}

pub(crate) async fn audit_batch(
    storage: &dyn ObjectStorage,
    probe_timeout: Duration,
    files: &[AssignmentFile],
    report: &mut ReconciliationReport,
) {
    for file in files {
        report.scanned += 1;
        match timeout(probe_timeout, storage.exists(&file.storage_path)).await {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                tracing::warn!(
                    file_id = file.id,
                    assignment_id = file.assignment_id,
                    path = %file.storage_path,
                    "Assignment file record points at a missing blob"
                );
                metrics::counter!("assignment_file_missing_blobs_total").increment(1);
                report.missing.push(MissingBlob {
                    file_id: file.id,
                    assignment_id: file.assignment_id,
                    storage_path: file.storage_path.clone(),
                });
            }
            Ok(Err(err)) => {
                tracing::error!(
                    file_id = file.id,
                    path = %file.storage_path,
                    error = %err,
                    "Failed to check assignment blob"
                );
                metrics::counter!("assignment_file_reconcile_errors_total").increment(1);
                report.errors += 1;
            }
            Err(_) => {
                tracing::error!(
                    file_id = file.id,
                    path = %file.storage_path,
                    timeout_ms = probe_timeout.as_millis() as u64,
                    "Timed out checking assignment blob"
                );
                metrics::counter!("assignment_file_reconcile_errors_total").increment(1);
                report.errors += 1;
            }
        }
    }
}
