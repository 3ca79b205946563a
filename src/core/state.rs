use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::assignment_files::{AssignmentFileService, FileLimits, PgAssignmentFileStore};
use crate::services::correction_status::{CorrectionStatusService, PgCorrectionStatusSource};
use crate::services::storage::ObjectStorage;

/// Shared handles for the services. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    pub fn new(settings: Settings, db: PgPool, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, storage }) }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.inner.storage
    }

    pub fn correction_statuses(&self) -> CorrectionStatusService<PgCorrectionStatusSource> {
        CorrectionStatusService::new(PgCorrectionStatusSource::new(self.db().clone()))
    }

    pub fn assignment_files(&self) -> AssignmentFileService<PgAssignmentFileStore> {
        AssignmentFileService::new(
            PgAssignmentFileStore::new(self.db().clone()),
            self.storage().clone(),
            FileLimits::from_settings(self.settings().storage()),
        )
    }
}
