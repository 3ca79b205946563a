use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::AssignmentFile;

pub const COLUMNS: &str =
    "id, assignment_id, name, storage_path, file_size, content_sha256, created_at";

pub struct CreateAssignmentFile<'a> {
    pub assignment_id: i64,
    pub name: &'a str,
    pub storage_path: &'a str,
    pub file_size: i64,
    pub content_sha256: &'a str,
    pub created_at: PrimitiveDateTime,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<AssignmentFile>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentFile>(&format!(
        "SELECT {COLUMNS}
         FROM assignment_files
         WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_by_assignment(
    pool: &PgPool,
    assignment_id: i64,
) -> Result<Vec<AssignmentFile>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentFile>(&format!(
        "SELECT {COLUMNS}
         FROM assignment_files
         WHERE assignment_id = $1
         ORDER BY created_at, id"
    ))
    .bind(assignment_id)
    .fetch_all(pool)
    .await
}

/// Keyset page over all files, for sweeps that must not hold a cursor open.
pub async fn list_after(
    pool: &PgPool,
    after_id: i64,
    limit: i64,
) -> Result<Vec<AssignmentFile>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentFile>(&format!(
        "SELECT {COLUMNS}
         FROM assignment_files
         WHERE id > $1
         ORDER BY id
         LIMIT $2"
    ))
    .bind(after_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn insert_with_executor(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAssignmentFile<'_>,
) -> Result<AssignmentFile, sqlx::Error> {
    sqlx::query_as::<_, AssignmentFile>(&format!(
        "INSERT INTO assignment_files (
            assignment_id, name, storage_path, file_size, content_sha256, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6)
        RETURNING {COLUMNS}"
    ))
    .bind(params.assignment_id)
    .bind(params.name)
    .bind(params.storage_path)
    .bind(params.file_size)
    .bind(params.content_sha256)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub async fn delete_with_executor(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
) -> Result<Option<AssignmentFile>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentFile>(&format!(
        "DELETE FROM assignment_files
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}
