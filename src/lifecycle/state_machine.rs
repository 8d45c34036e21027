use crate::lifecycle::error::{LifecycleError, LifecycleResult};
use crate::record::{Network, ReplicaRecord, ReplicaStatus};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub enum ReplicaEvent {
    Propose {
        node: String,
    },
    Accept,
    Reject {
        reason: String,
    },
    Error {
        reason: String,
    },
    Publish {
        chain_replica_id: u64,
    },
    Activate {
        activation_time: DateTime<Utc>,
        expiration_time: DateTime<Utc>,
    },
    Terminate {
        reason: Option<String>,
    },
}

impl ReplicaStatus {
    /// Forward edges of the replica lifecycle.
    pub fn can_advance_to(&self, next: ReplicaStatus) -> bool {
        use ReplicaStatus::*;
        matches!(
            (self, next),
            (Queued, Proposing)
                | (Proposing, Accepted)
                | (Proposing, Rejected)
                | (Proposing, Errored)
                | (Accepted, Published)
                | (Published, Active)
                | (Active, Terminated)
        )
    }

    /// Statuses with no outgoing edge.
    pub fn is_sink(&self) -> bool {
        matches!(
            self,
            ReplicaStatus::Rejected
                | ReplicaStatus::Errored
                | ReplicaStatus::Terminated
                | ReplicaStatus::Unknown
        )
    }
}

/// Drives a single replica record through its lifecycle.
///
/// Only the transitions listed in [`ReplicaStatus::can_advance_to`] are
/// accepted. A rejected or errored replica is never retried here; the
/// scheduler queues a fresh replica instead.
pub struct ReplicaLifecycle {
    record: ReplicaRecord,
}

impl ReplicaLifecycle {
    pub fn new(record: ReplicaRecord) -> LifecycleResult<Self> {
        if !record.check_invariants() {
            return Err(LifecycleError::InvariantViolation(format!(
                "{} replica of batch {} carries fields of a later status",
                record.status, record.batch_root_id
            )));
        }
        Ok(Self { record })
    }

    pub fn current_status(&self) -> ReplicaStatus {
        self.record.status
    }

    pub fn record(&self) -> &ReplicaRecord {
        &self.record
    }

    pub fn into_record(self) -> ReplicaRecord {
        self.record
    }

    /// Apply an event. On error the record is left untouched.
    pub fn transition(&mut self, event: ReplicaEvent) -> LifecycleResult<ReplicaStatus> {
        let current = self.record.status;
        let next = match &event {
            ReplicaEvent::Propose { .. } => ReplicaStatus::Proposing,
            ReplicaEvent::Accept => ReplicaStatus::Accepted,
            ReplicaEvent::Reject { .. } => ReplicaStatus::Rejected,
            ReplicaEvent::Error { .. } => ReplicaStatus::Errored,
            ReplicaEvent::Publish { .. } => ReplicaStatus::Published,
            ReplicaEvent::Activate { .. } => ReplicaStatus::Active,
            ReplicaEvent::Terminate { .. } => ReplicaStatus::Terminated,
        };

        if !current.can_advance_to(next) {
            return Err(LifecycleError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        let record = &mut self.record;
        match event {
            ReplicaEvent::Propose { node } => {
                record.node = Some(node);
                record.status_text = None;
            }
            ReplicaEvent::Accept => {
                record.status_text = None;
            }
            ReplicaEvent::Reject { reason } | ReplicaEvent::Error { reason } => {
                record.status_text = Some(reason);
            }
            ReplicaEvent::Publish { chain_replica_id } => {
                record.chain_replica_id = Some(chain_replica_id);
            }
            ReplicaEvent::Activate {
                activation_time,
                expiration_time,
            } => {
                if expiration_time <= activation_time {
                    return Err(LifecycleError::InvariantViolation(format!(
                        "expiration {expiration_time} is not after activation {activation_time}"
                    )));
                }
                record.activation_time = Some(activation_time);
                record.expiration_time = Some(expiration_time);
            }
            ReplicaEvent::Terminate { reason } => {
                record.status_text = reason;
            }
        }

        record.status = next;
        record.status_changed_at = Utc::now();
        Ok(next)
    }
}

/// Allocates queued replicas sharing one batch root.
#[derive(Debug, Clone)]
pub struct ReplicaBatch {
    batch_root_id: String,
    next_sequence: u64,
}

impl ReplicaBatch {
    pub fn new(batch_root_id: impl Into<String>) -> Self {
        Self {
            batch_root_id: batch_root_id.into(),
            next_sequence: 0,
        }
    }

    pub fn batch_root_id(&self) -> &str {
        &self.batch_root_id
    }

    /// Queue a new replica. Sequence numbers increase monotonically.
    pub fn enqueue(&mut self, network: Network) -> ReplicaRecord {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        ReplicaRecord::queued(network, self.batch_root_id.clone(), sequence)
    }
}

/// Display order: lifecycle status first, then queue position.
pub fn sort_for_display(replicas: &mut [ReplicaRecord]) {
    replicas.sort_by(|a, b| match a.status.cmp(&b.status) {
        Ordering::Equal => a.queue_sequence.cmp(&b.queue_sequence),
        other => other,
    });
}
