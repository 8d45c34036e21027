use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("Missing required field for new record: {0}")]
    MissingField(&'static str),
}

pub type RecordResult<T> = Result<T, RecordError>;
