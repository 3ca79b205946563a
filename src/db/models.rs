use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: i64,
    pub name: String,
    pub created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AssignmentFile {
    pub id: i64,
    pub assignment_id: i64,
    pub name: String,
    pub storage_path: String,
    pub file_size: i64,
    pub content_sha256: String,
    pub created_at: PrimitiveDateTime,
}
