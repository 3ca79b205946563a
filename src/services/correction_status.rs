use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::types::CorrectionStatus;
use crate::repositories::{self, corrections::CorrectedPair, solutions::CurrentSolution};
use crate::repositories::RepositoryError;

/// One row of a teacher's correction overview. Derived on every request and
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionStatusView {
    pub assignment_id: i64,
    pub assignment_name: String,
    pub student_id: i64,
    pub student_full_name: String,
    pub student_identifier: String,
    pub solution_id: i64,
    pub solution_test_result: Option<String>,
    pub correction_id: Option<i64>,
    pub status: CorrectionStatus,
    pub grade: Option<f64>,
}

impl From<CurrentSolution> for CorrectionStatusView {
    fn from(solution: CurrentSolution) -> Self {
        let (correction_id, status, grade) = match solution.correction {
            Some(correction) => (Some(correction.id), correction.status, correction.grade),
            None => (None, CorrectionStatus::Pending, None),
        };

        Self {
            assignment_id: solution.assignment_id,
            assignment_name: solution.assignment_name,
            student_id: solution.student_id,
            student_full_name: solution.student_full_name,
            student_identifier: solution.student_identifier,
            solution_id: solution.solution_id,
            solution_test_result: solution.test_result,
            correction_id,
            status,
            grade,
        }
    }
}

#[derive(Debug, Error)]
pub enum CorrectionStatusError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(
        "student {student_id} has corrections for assignment {assignment_id} but no solution"
    )]
    IntegrityViolation { student_id: i64, assignment_id: i64 },
}

/// Read side needed to build the overview.
#[async_trait]
pub trait CorrectionStatusSource: Send + Sync {
    async fn corrected_pairs(&self, teacher_id: i64) -> Result<Vec<CorrectedPair>, RepositoryError>;

    async fn current_solution(
        &self,
        pair: CorrectedPair,
    ) -> Result<Option<CurrentSolution>, RepositoryError>;
}

#[derive(Debug, Clone)]
pub struct PgCorrectionStatusSource {
    pool: PgPool,
}

impl PgCorrectionStatusSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CorrectionStatusSource for PgCorrectionStatusSource {
    async fn corrected_pairs(&self, teacher_id: i64) -> Result<Vec<CorrectedPair>, RepositoryError> {
        Ok(repositories::corrections::list_corrected_pairs(&self.pool, teacher_id).await?)
    }

    async fn current_solution(
        &self,
        pair: CorrectedPair,
    ) -> Result<Option<CurrentSolution>, RepositoryError> {
        Ok(repositories::solutions::find_current(&self.pool, pair.student_id, pair.assignment_id)
            .await?)
    }
}

pub struct CorrectionStatusService<S> {
    source: S,
}

impl<S: CorrectionStatusSource> CorrectionStatusService<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Status of every (student, assignment) pair the teacher has corrected,
    /// in the order the source lists the pairs.
    ///
    /// The status comes from the student's newest solution, whoever corrected
    /// it. A newer, uncorrected resubmission therefore shows as pending even if
    /// this teacher graded an older one.
    pub async fn status_for_teacher(
        &self,
        teacher_id: i64,
    ) -> Result<Vec<CorrectionStatusView>, CorrectionStatusError> {
        let pairs = self.source.corrected_pairs(teacher_id).await?;
        let mut views = Vec::with_capacity(pairs.len());

        for pair in pairs {
            let Some(solution) = self.source.current_solution(pair).await? else {
                tracing::error!(
                    teacher_id,
                    student_id = pair.student_id,
                    assignment_id = pair.assignment_id,
                    "Corrected pair has no current solution"
                );
                return Err(CorrectionStatusError::IntegrityViolation {
                    student_id: pair.student_id,
                    assignment_id: pair.assignment_id,
                });
            };

            let view = CorrectionStatusView::from(solution);
            tracing::debug!(
                teacher_id,
                student_id = view.student_id,
                assignment_id = view.assignment_id,
                solution_id = view.solution_id,
                status = view.status.as_str(),
                "Resolved correction status"
            );
            views.push(view);
        }

        tracing::info!(teacher_id, views = views.len(), "Built correction status overview");
        metrics::counter!("correction_status_views_total").increment(views.len() as u64);

        Ok(views)
    }
}
