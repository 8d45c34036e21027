use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store read failed: {0}")]
    ReadFailure(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Record error: {0}")]
    Record(#[from] crate::record::RecordError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
