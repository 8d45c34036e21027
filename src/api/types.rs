use crate::lifecycle::{sort_for_display, ReplicaSet};
use crate::record::{ObjectRecord, OverallStatus, ReplicaRecord};
use serde::{Deserialize, Serialize};

/// Replication summary attached to an object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealsView {
    pub status: OverallStatus,
    pub deals: Vec<ReplicaRecord>,
}

impl DealsView {
    pub fn from_set(set: ReplicaSet) -> Self {
        let status = set.overall_status();
        let mut deals = set.records;
        sort_for_display(&mut deals);
        Self { status, deals }
    }

    /// Nothing replicated yet
    pub fn pending() -> Self {
        Self {
            status: OverallStatus::Ongoing,
            deals: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectView {
    #[serde(flatten)]
    pub record: ObjectRecord,
    pub deals: DealsView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListObjectsResponse {
    pub objects: Vec<ObjectView>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
}
