use crate::record::{ObjectRecord, OverallStatus};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One part of a multi-file upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub media_kind: String,
    pub bytes: Bytes,
}

/// Content handed to the pinning service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinContent {
    /// A single anonymous body
    Blob { bytes: Bytes, media_kind: String },
    /// A named file set, stored as a directory
    Files(Vec<UploadFile>),
}

impl PinContent {
    /// Total payload bytes
    pub fn len(&self) -> u64 {
        match self {
            PinContent::Blob { bytes, .. } => bytes.len() as u64,
            PinContent::Files(files) => files.iter().map(|f| f.bytes.len() as u64).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PinContent::Blob { bytes, .. } => bytes.is_empty(),
            PinContent::Files(files) => files.is_empty(),
        }
    }
}

/// What the pinning service reports back for pinned content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinReceipt {
    pub content_id: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status_text}")]
pub struct PinError {
    pub status_text: String,
}

impl PinError {
    pub fn new(status_text: impl Into<String>) -> Self {
        Self {
            status_text: status_text.into(),
        }
    }
}

/// A registered upload. Replication has not started, so the overall status
/// is always `ongoing`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub record: ObjectRecord,
    pub status: OverallStatus,
}
