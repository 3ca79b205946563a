use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use time::macros::datetime;

use crate::db::models::{Assignment, AssignmentFile};
use crate::db::types::CorrectionStatus;
use crate::repositories::assignment_files::CreateAssignmentFile;
use crate::repositories::corrections::CorrectedPair;
use crate::repositories::solutions::{CorrectionSummary, CurrentSolution};
use crate::repositories::RepositoryError;
use crate::services::assignment_files::{AssignmentFileStore, AssignmentFileTransaction};
use crate::services::correction_status::CorrectionStatusSource;
use crate::services::storage::{DeleteError, ObjectStorage, StorageError, StoredObject, UploadError};

pub(crate) fn uncorrected_solution(
    solution_id: i64,
    student_id: i64,
    assignment_id: i64,
) -> CurrentSolution {
    CurrentSolution {
        solution_id,
        test_result: Some("passed".to_string()),
        created_at: datetime!(2025-03-01 10:00:00),
        student_id,
        student_full_name: format!("Student {student_id}"),
        student_identifier: format!("ID-{student_id}"),
        assignment_id,
        assignment_name: format!("TP {assignment_id}"),
        correction: None,
    }
}

pub(crate) fn corrected_solution(
    solution_id: i64,
    student_id: i64,
    assignment_id: i64,
    correction_id: i64,
    status: CorrectionStatus,
    grade: Option<f64>,
) -> CurrentSolution {
    CurrentSolution {
        correction: Some(CorrectionSummary { id: correction_id, status, grade }),
        ..uncorrected_solution(solution_id, student_id, assignment_id)
    }
}

/// Pairs per teacher in insertion order, plus the current solution of each pair.
#[derive(Default)]
pub(crate) struct FixtureCorrectionSource {
    pairs: Vec<(i64, CorrectedPair)>,
    solutions: HashMap<CorrectedPair, CurrentSolution>,
    unreachable: bool,
}

impl FixtureCorrectionSource {
    pub(crate) fn with_solution(mut self, teacher_id: i64, solution: CurrentSolution) -> Self {
        let pair = CorrectedPair {
            student_id: solution.student_id,
            assignment_id: solution.assignment_id,
        };
        self.pairs.push((teacher_id, pair));
        self.solutions.insert(pair, solution);
        self
    }

    pub(crate) fn with_dangling_pair(
        mut self,
        teacher_id: i64,
        student_id: i64,
        assignment_id: i64,
    ) -> Self {
        self.pairs.push((teacher_id, CorrectedPair { student_id, assignment_id }));
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.unreachable = true;
        self
    }
}

#[async_trait]
impl CorrectionStatusSource for FixtureCorrectionSource {
    async fn corrected_pairs(&self, teacher_id: i64) -> Result<Vec<CorrectedPair>, RepositoryError> {
        if self.unreachable {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .pairs
            .iter()
            .filter(|(owner, _)| *owner == teacher_id)
            .map(|(_, pair)| *pair)
            .collect())
    }

    async fn current_solution(
        &self,
        pair: CorrectedPair,
    ) -> Result<Option<CurrentSolution>, RepositoryError> {
        Ok(self.solutions.get(&pair).cloned())
    }
}

pub(crate) fn assignment_file(id: i64, assignment_id: i64, name: &str) -> AssignmentFile {
    AssignmentFile {
        id,
        assignment_id,
        name: name.to_string(),
        storage_path: format!("assignments/{assignment_id}/{id}_{name}"),
        file_size: 8,
        content_sha256: "0".repeat(64),
        created_at: datetime!(2025-03-01 09:00:00),
    }
}

#[derive(Default)]
pub(crate) struct MemoryFileState {
    pub(crate) files: BTreeMap<i64, AssignmentFile>,
    pub(crate) assignments: BTreeMap<i64, Assignment>,
    pub(crate) next_id: i64,
    pub(crate) transactions_opened: usize,
    pub(crate) destroy_calls: usize,
    pub(crate) commits: usize,
    pub(crate) rollbacks: usize,
    pub(crate) fail_insert: bool,
    pub(crate) fail_destroy: bool,
    pub(crate) fail_commit: bool,
}

/// Record store whose transactions stage their writes and apply them on commit.
#[derive(Clone, Default)]
pub(crate) struct MemoryFileStore {
    inner: Arc<Mutex<MemoryFileState>>,
}

impl MemoryFileStore {
    pub(crate) fn with_assignment(self, id: i64, name: &str) -> Self {
        self.state().assignments.insert(
            id,
            Assignment { id, name: name.to_string(), created_at: datetime!(2025-02-01 08:00:00) },
        );
        self
    }

    pub(crate) fn with_file(self, file: AssignmentFile) -> Self {
        {
            let mut state = self.state();
            state.next_id = state.next_id.max(file.id);
            state.files.insert(file.id, file);
        }
        self
    }

    pub(crate) fn configure(&self, apply: impl FnOnce(&mut MemoryFileState)) {
        apply(&mut self.state());
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, MemoryFileState> {
        self.inner.lock().expect("memory store lock")
    }
}

pub(crate) struct MemoryFileTransaction {
    inner: Arc<Mutex<MemoryFileState>>,
    inserted: Vec<AssignmentFile>,
    destroyed: Vec<i64>,
}

fn injected_failure(message: &str) -> RepositoryError {
    RepositoryError::Database(sqlx::Error::Protocol(message.to_string()))
}

#[async_trait]
impl AssignmentFileStore for MemoryFileStore {
    type Transaction = MemoryFileTransaction;

    async fn find(&self, id: i64) -> Result<Option<AssignmentFile>, RepositoryError> {
        Ok(self.state().files.get(&id).cloned())
    }

    async fn find_assignment(&self, id: i64) -> Result<Option<Assignment>, RepositoryError> {
        Ok(self.state().assignments.get(&id).cloned())
    }

    async fn list_for_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<AssignmentFile>, RepositoryError> {
        let mut files: Vec<_> = self
            .state()
            .files
            .values()
            .filter(|file| file.assignment_id == assignment_id)
            .cloned()
            .collect();
        files.sort_by_key(|file| (file.created_at, file.id));
        Ok(files)
    }

    async fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        self.state().transactions_opened += 1;
        Ok(MemoryFileTransaction {
            inner: Arc::clone(&self.inner),
            inserted: Vec::new(),
            destroyed: Vec::new(),
        })
    }
}

#[async_trait]
impl AssignmentFileTransaction for MemoryFileTransaction {
    async fn insert(
        &mut self,
        params: CreateAssignmentFile<'_>,
    ) -> Result<AssignmentFile, RepositoryError> {
        let mut state = self.inner.lock().expect("memory store lock");
        if state.fail_insert {
            return Err(injected_failure("insert rejected"));
        }
        state.next_id += 1;
        let file = AssignmentFile {
            id: state.next_id,
            assignment_id: params.assignment_id,
            name: params.name.to_string(),
            storage_path: params.storage_path.to_string(),
            file_size: params.file_size,
            content_sha256: params.content_sha256.to_string(),
            created_at: params.created_at,
        };
        self.inserted.push(file.clone());
        Ok(file)
    }

    async fn destroy(&mut self, id: i64) -> Result<Option<AssignmentFile>, RepositoryError> {
        let mut state = self.inner.lock().expect("memory store lock");
        state.destroy_calls += 1;
        if state.fail_destroy {
            return Err(injected_failure("foreign key violation"));
        }
        if self.destroyed.contains(&id) {
            return Ok(None);
        }
        let removed = state.files.get(&id).cloned();
        if removed.is_some() {
            self.destroyed.push(id);
        }
        Ok(removed)
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        let mut state = self.inner.lock().expect("memory store lock");
        if state.fail_commit {
            return Err(injected_failure("connection reset during commit"));
        }
        for id in &self.destroyed {
            state.files.remove(id);
        }
        for file in self.inserted {
            state.files.insert(file.id, file);
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.inner.lock().expect("memory store lock").rollbacks += 1;
        Ok(())
    }
}

/// Object storage double that records every call and can be told to fail.
#[derive(Default)]
pub(crate) struct MemoryObjectStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
    fail_lookups: AtomicBool,
    delete_delay: Mutex<Option<Duration>>,
    stall_after_delete: Mutex<Option<Duration>>,
}

impl MemoryObjectStorage {
    pub(crate) fn with_object(self, path: &str) -> Self {
        self.objects.lock().expect("objects lock").insert(path.to_string(), b"%PDF-1.7".to_vec());
        self
    }

    pub(crate) fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn delay_deletes(&self, delay: Duration) {
        *self.delete_delay.lock().expect("delay lock") = Some(delay);
    }

    /// Removes the object, then withholds the acknowledgement for `stall`.
    pub(crate) fn stall_after_delete(&self, stall: Duration) {
        *self.stall_after_delete.lock().expect("stall lock") = Some(stall);
    }

    pub(crate) fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn contains(&self, path: &str) -> bool {
        self.objects.lock().expect("objects lock").contains_key(path)
    }

    pub(crate) fn remove(&self, path: &str) {
        self.objects.lock().expect("objects lock").remove(path);
    }

    pub(crate) fn upload_calls(&self) -> Vec<String> {
        self.uploads.lock().expect("uploads lock").clone()
    }

    pub(crate) fn delete_calls(&self) -> Vec<String> {
        self.deletes.lock().expect("deletes lock").clone()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<StoredObject, UploadError> {
        self.uploads.lock().expect("uploads lock").push(path.to_string());
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(UploadError::Failed {
                path: path.to_string(),
                message: "bucket unavailable".to_string(),
            });
        }
        let object = StoredObject::describe(&bytes);
        self.objects.lock().expect("objects lock").insert(path.to_string(), bytes);
        Ok(object)
    }

    async fn delete(&self, path: &str) -> Result<(), DeleteError> {
        self.deletes.lock().expect("deletes lock").push(path.to_string());
        let delay = *self.delete_delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(DeleteError::Failed {
                path: path.to_string(),
                message: "access denied".to_string(),
            });
        }
        self.remove(path);
        let stall = *self.stall_after_delete.lock().expect("stall lock");
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StorageError::Failed {
                path: path.to_string(),
                message: "service unavailable".to_string(),
            });
        }
        Ok(self.contains(path))
    }
}
