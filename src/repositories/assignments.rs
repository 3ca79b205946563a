use sqlx::PgPool;

use crate::db::models::Assignment;

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(
        "SELECT id, name, created_at
         FROM assignments
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
