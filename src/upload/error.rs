use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Empty payload")]
    EmptyPayload,

    #[error("Pinning service rejected content: {0}")]
    UpstreamPinFailure(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type UploadResult<T> = Result<T, UploadError>;
