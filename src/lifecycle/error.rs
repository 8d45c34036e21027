use crate::record::ReplicaStatus;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Invalid replica transition: {from} -> {to}")]
    InvalidTransition {
        from: ReplicaStatus,
        to: ReplicaStatus,
    },

    #[error("Replica invariant violated: {0}")]
    InvariantViolation(String),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
