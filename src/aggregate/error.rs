use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Store read failed during aggregation: {0}")]
    StoreReadFailure(#[from] crate::store::StoreError),
}

pub type AggregateResult<T> = Result<T, AggregateError>;
