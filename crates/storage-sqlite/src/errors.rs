//! Mapping from diesel/r2d2 failures into the core error type.

use thiserror::Error;

use creatorhub_core::errors::DatabaseError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("query failed: {0}")]
    Diesel(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl From<StorageError> for creatorhub_core::Error {
    fn from(err: StorageError) -> Self {
        let db = match err {
            StorageError::Diesel(diesel::result::Error::NotFound) => {
                DatabaseError::NotFound("record not found".to_string())
            }
            StorageError::Diesel(e) => DatabaseError::QueryFailed(e.to_string()),
            StorageError::Pool(msg) => DatabaseError::Pool(msg),
            StorageError::Runtime(msg) => DatabaseError::Internal(msg),
        };
        creatorhub_core::Error::Database(db)
    }
}
