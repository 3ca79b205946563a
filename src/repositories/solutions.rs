use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::PrimitiveDateTime;

use crate::db::types::CorrectionStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionSummary {
    pub id: i64,
    pub status: CorrectionStatus,
    pub grade: Option<f64>,
}

/// The newest solution of a student for an assignment, with the names needed
/// for display and its correction if one exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentSolution {
    pub solution_id: i64,
    pub test_result: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub student_id: i64,
    pub student_full_name: String,
    pub student_identifier: String,
    pub assignment_id: i64,
    pub assignment_name: String,
    pub correction: Option<CorrectionSummary>,
}

#[derive(FromRow)]
struct CurrentSolutionRow {
    solution_id: i64,
    test_result: Option<String>,
    created_at: PrimitiveDateTime,
    student_id: i64,
    student_full_name: String,
    student_identifier: String,
    assignment_id: i64,
    assignment_name: String,
    correction_id: Option<i64>,
    correction_status: Option<CorrectionStatus>,
    correction_grade: Option<f64>,
}

impl From<CurrentSolutionRow> for CurrentSolution {
    fn from(row: CurrentSolutionRow) -> Self {
        let correction = match (row.correction_id, row.correction_status) {
            (Some(id), Some(status)) => {
                Some(CorrectionSummary { id, status, grade: row.correction_grade })
            }
            _ => None,
        };

        Self {
            solution_id: row.solution_id,
            test_result: row.test_result,
            created_at: row.created_at,
            student_id: row.student_id,
            student_full_name: row.student_full_name,
            student_identifier: row.student_identifier,
            assignment_id: row.assignment_id,
            assignment_name: row.assignment_name,
            correction,
        }
    }
}

/// Ties on `created_at` go to the highest solution id.
pub async fn find_current(
    pool: &PgPool,
    student_id: i64,
    assignment_id: i64,
) -> Result<Option<CurrentSolution>, sqlx::Error> {
    let row = sqlx::query_as::<_, CurrentSolutionRow>(
        "SELECT s.id AS solution_id,
                s.test_result,
                s.created_at,
                st.id AS student_id,
                st.full_name AS student_full_name,
                st.identifier AS student_identifier,
                a.id AS assignment_id,
                a.name AS assignment_name,
                c.id AS correction_id,
                c.status AS correction_status,
                c.grade AS correction_grade
         FROM solutions s
         JOIN accounts st ON st.id = s.student_id
         JOIN assignments a ON a.id = s.assignment_id
         LEFT JOIN corrections c ON c.solution_id = s.id
         WHERE s.student_id = $1
           AND s.assignment_id = $2
         ORDER BY s.created_at DESC, s.id DESC
         LIMIT 1",
    )
    .bind(student_id)
    .bind(assignment_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(CurrentSolution::from))
}
