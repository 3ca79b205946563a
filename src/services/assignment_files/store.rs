use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::{Assignment, AssignmentFile};
use crate::repositories::{self, assignment_files::CreateAssignmentFile, RepositoryError};

/// Record side of assignment files. Writes only happen through a
/// [`AssignmentFileTransaction`] so they can be undone.
#[async_trait]
pub trait AssignmentFileStore: Send + Sync {
    type Transaction: AssignmentFileTransaction;

    async fn find(&self, id: i64) -> Result<Option<AssignmentFile>, RepositoryError>;

    async fn find_assignment(&self, id: i64) -> Result<Option<Assignment>, RepositoryError>;

    async fn list_for_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<AssignmentFile>, RepositoryError>;

    async fn begin(&self) -> Result<Self::Transaction, RepositoryError>;
}

#[async_trait]
pub trait AssignmentFileTransaction: Send {
    async fn insert(
        &mut self,
        params: CreateAssignmentFile<'_>,
    ) -> Result<AssignmentFile, RepositoryError>;

    /// Returns the removed row, or `None` when no row had this id.
    async fn destroy(&mut self, id: i64) -> Result<Option<AssignmentFile>, RepositoryError>;

    async fn commit(self) -> Result<(), RepositoryError>;

    async fn rollback(self) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone)]
pub struct PgAssignmentFileStore {
    pool: PgPool,
}

impl PgAssignmentFileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgAssignmentFileTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AssignmentFileStore for PgAssignmentFileStore {
    type Transaction = PgAssignmentFileTransaction;

    async fn find(&self, id: i64) -> Result<Option<AssignmentFile>, RepositoryError> {
        Ok(repositories::assignment_files::find_by_id(&self.pool, id).await?)
    }

    async fn find_assignment(&self, id: i64) -> Result<Option<Assignment>, RepositoryError> {
        Ok(repositories::assignments::find_by_id(&self.pool, id).await?)
    }

    async fn list_for_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<AssignmentFile>, RepositoryError> {
        Ok(repositories::assignment_files::list_by_assignment(&self.pool, assignment_id).await?)
    }

    async fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(PgAssignmentFileTransaction { tx })
    }
}

#[async_trait]
impl AssignmentFileTransaction for PgAssignmentFileTransaction {
    async fn insert(
        &mut self,
        params: CreateAssignmentFile<'_>,
    ) -> Result<AssignmentFile, RepositoryError> {
        Ok(repositories::assignment_files::insert_with_executor(&mut *self.tx, params).await?)
    }

    async fn destroy(&mut self, id: i64) -> Result<Option<AssignmentFile>, RepositoryError> {
        Ok(repositories::assignment_files::delete_with_executor(&mut *self.tx, id).await?)
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
