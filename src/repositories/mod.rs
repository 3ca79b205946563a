pub mod assignment_files;
pub mod assignments;
pub mod corrections;
pub mod solutions;

use thiserror::Error;

/// Failure talking to the relational store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
