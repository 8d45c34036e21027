use crate::record::{OverallStatus, ReplicaRecord};
use serde::{Deserialize, Serialize};

/// Collapse an object's replicas into one overall status.
///
/// `Finalized` only when there is at least one replica and every replica is
/// `active`. Terminated and unrecognised statuses keep the object `Ongoing`.
pub fn resolve(replicas: &[ReplicaRecord]) -> OverallStatus {
    if replicas.is_empty() {
        return OverallStatus::Ongoing;
    }
    if replicas.iter().all(|r| r.status.is_terminal_success()) {
        OverallStatus::Finalized
    } else {
        OverallStatus::Ongoing
    }
}

/// Result of the replica side lookup for one object.
///
/// Elements of the stored list that could not be parsed are counted in
/// `malformed` rather than dropped silently, so they still hold the object
/// at `Ongoing`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaSet {
    pub records: Vec<ReplicaRecord>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub malformed: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl ReplicaSet {
    pub fn new(records: Vec<ReplicaRecord>) -> Self {
        Self {
            records,
            malformed: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.malformed == 0
    }

    pub fn overall_status(&self) -> OverallStatus {
        if self.malformed > 0 {
            return OverallStatus::Ongoing;
        }
        resolve(&self.records)
    }
}
