use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage network a replica was made on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Nerpanet,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Nerpanet => "nerpanet",
            Network::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replica status, declared in lifecycle order.
///
/// The declaration order is significant: it drives `Ord`, the per-network
/// bucket layout in the aggregator and the exposition order in the exporter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ReplicaStatus {
    Queued,
    Proposing,
    Accepted,
    Rejected,
    #[serde(alias = "failed")]
    Errored,
    Published,
    Active,
    Terminated,
    /// Any status string this build does not recognise.
    #[serde(other)]
    Unknown,
}

impl ReplicaStatus {
    pub const ALL: [ReplicaStatus; 9] = [
        ReplicaStatus::Queued,
        ReplicaStatus::Proposing,
        ReplicaStatus::Accepted,
        ReplicaStatus::Rejected,
        ReplicaStatus::Errored,
        ReplicaStatus::Published,
        ReplicaStatus::Active,
        ReplicaStatus::Terminated,
        ReplicaStatus::Unknown,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Position in the fixed enumeration order.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicaStatus::Queued => "queued",
            ReplicaStatus::Proposing => "proposing",
            ReplicaStatus::Accepted => "accepted",
            ReplicaStatus::Rejected => "rejected",
            ReplicaStatus::Errored => "errored",
            ReplicaStatus::Published => "published",
            ReplicaStatus::Active => "active",
            ReplicaStatus::Terminated => "terminated",
            ReplicaStatus::Unknown => "unknown",
        }
    }

    /// The only status that counts toward finalization.
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, ReplicaStatus::Active)
    }

    /// Whether a ledger identifier may be present in this status.
    pub fn is_published(&self) -> bool {
        matches!(
            self,
            ReplicaStatus::Published | ReplicaStatus::Active | ReplicaStatus::Terminated
        )
    }

    /// Whether activation/expiration times may be present in this status.
    pub fn is_activated(&self) -> bool {
        matches!(self, ReplicaStatus::Active | ReplicaStatus::Terminated)
    }
}

impl std::fmt::Display for ReplicaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One network-specific persistence attempt for an object's data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaRecord {
    #[serde(default)]
    pub network: Network,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    /// Root identifier of the batch (deal) this replica belongs to.
    #[serde(rename = "batchRootCid")]
    pub batch_root_id: String,

    pub status: ReplicaStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,

    #[serde(rename = "lastChanged")]
    pub status_changed_at: DateTime<Utc>,

    /// Position within the batch queue, assigned when the replica is queued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_sequence: Option<u64>,

    #[serde(rename = "pieceCid", default, skip_serializing_if = "Option::is_none")]
    pub piece_id: Option<String>,

    #[serde(
        rename = "chainDealID",
        alias = "chainABIID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub chain_replica_id: Option<u64>,

    #[serde(
        rename = "dealActivation",
        alias = "abiActivation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub activation_time: Option<DateTime<Utc>>,

    #[serde(
        rename = "dealExpiration",
        alias = "abiMoribund",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_time: Option<DateTime<Utc>>,
}

impl ReplicaRecord {
    /// A freshly scheduled replica with no node assigned.
    pub fn queued(network: Network, batch_root_id: impl Into<String>, sequence: u64) -> Self {
        Self {
            network,
            node: None,
            batch_root_id: batch_root_id.into(),
            status: ReplicaStatus::Queued,
            status_text: None,
            status_changed_at: Utc::now(),
            queue_sequence: Some(sequence),
            piece_id: None,
            chain_replica_id: None,
            activation_time: None,
            expiration_time: None,
        }
    }

    pub fn identity(&self) -> ReplicaIdentity {
        ReplicaIdentity {
            network: self.network,
            node: self.node.clone(),
            batch_root_id: self.batch_root_id.clone(),
        }
    }

    /// Fields that only exist past a given status must be unset before it.
    pub fn check_invariants(&self) -> bool {
        (self.chain_replica_id.is_none() || self.status.is_published())
            && (self.activation_time.is_none() || self.status.is_activated())
            && (self.expiration_time.is_none() || self.status.is_activated())
    }
}

/// Identity of the underlying replica, used to count it once per scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplicaIdentity {
    pub network: Network,
    pub node: Option<String>,
    pub batch_root_id: String,
}

/// Pin status on the content-addressed network.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PinStatus {
    Queued,
    Pinning,
    Pinned,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub status: PinStatus,

    #[serde(rename = "size", default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub media_kind: String,
}

pub const DIRECTORY_MEDIA_KIND: &str = "directory";

/// Durable record of one uploaded object, keyed by owner and content id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectRecord {
    #[serde(rename = "cid")]
    pub object_id: String,

    #[serde(rename = "owner")]
    pub owner_key: String,

    #[serde(rename = "size")]
    pub size_bytes: u64,

    /// Mime type, or `"directory"` for multi-file uploads.
    #[serde(rename = "type")]
    pub media_kind: String,

    #[serde(default)]
    pub files: Vec<FileEntry>,

    pub pin: Pin,

    /// Name of the credential used for the upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
}

impl ObjectRecord {
    pub fn is_directory(&self) -> bool {
        self.media_kind == DIRECTORY_MEDIA_KIND
    }

    pub fn is_pinned(&self) -> bool {
        self.pin.status == PinStatus::Pinned
    }
}

/// Derived classification of an object's replicas. Never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ongoing,
    Finalized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order_matches_lifecycle() {
        assert!(ReplicaStatus::Queued < ReplicaStatus::Proposing);
        assert!(ReplicaStatus::Published < ReplicaStatus::Active);
        assert!(ReplicaStatus::Active < ReplicaStatus::Terminated);
        for (i, status) in ReplicaStatus::ALL.iter().enumerate() {
            assert_eq!(status.index(), i);
        }
    }

    #[test]
    fn test_unrecognised_values_map_to_unknown() {
        let json = r#"{
            "network": "calibration",
            "batchRootCid": "bafyroot",
            "status": "exploded",
            "lastChanged": "2021-03-09T20:47:39Z"
        }"#;
        let record: ReplicaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.network, Network::Unknown);
        assert_eq!(record.status, ReplicaStatus::Unknown);
    }

    #[test]
    fn test_absent_network_is_unknown() {
        let json = r#"{
            "batchRootCid": "bafyroot",
            "status": "queued",
            "lastChanged": "2021-03-09T20:47:39Z"
        }"#;
        let record: ReplicaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.network, Network::Unknown);
        assert!(record.node.is_none());
    }

    #[test]
    fn test_legacy_field_names() {
        let json = r#"{
            "network": "mainnet",
            "node": "f01234",
            "batchRootCid": "bafyroot",
            "status": "failed",
            "lastChanged": "2021-03-09T20:47:39Z",
            "chainABIID": 42
        }"#;
        let record: ReplicaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, ReplicaStatus::Errored);
        assert_eq!(record.chain_replica_id, Some(42));
        assert!(!record.check_invariants());
    }

    #[test]
    fn test_identity_ignores_status() {
        let mut a = ReplicaRecord::queued(Network::Mainnet, "root", 0);
        a.node = Some("f0100".into());
        let mut b = a.clone();
        b.status = ReplicaStatus::Active;
        b.queue_sequence = None;
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_object_record_wire_names() {
        let json = r#"{
            "cid": "bafyobject",
            "owner": "github|1",
            "size": 1024,
            "type": "directory",
            "files": [{"name": "a.json", "type": "application/json"}],
            "pin": {"status": "pinned", "size": 1100, "created": "2021-03-09T20:47:39Z"},
            "scope": "default",
            "created": "2021-03-09T20:47:40Z"
        }"#;
        let record: ObjectRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_directory());
        assert!(record.is_pinned());
        assert_eq!(record.files.len(), 1);
        assert_eq!(record.pin.size_bytes, Some(1100));
    }
}
