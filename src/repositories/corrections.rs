use serde::Serialize;
use sqlx::{FromRow, PgPool};

/// A (student, assignment) combination that a teacher has corrected at least once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, FromRow)]
pub struct CorrectedPair {
    pub student_id: i64,
    pub assignment_id: i64,
}

pub async fn list_corrected_pairs(
    pool: &PgPool,
    teacher_id: i64,
) -> Result<Vec<CorrectedPair>, sqlx::Error> {
    sqlx::query_as::<_, CorrectedPair>(
        "SELECT DISTINCT s.student_id, s.assignment_id
         FROM corrections c
         JOIN solutions s ON s.id = c.solution_id
         WHERE c.teacher_id = $1
         ORDER BY s.student_id, s.assignment_id",
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}
