//! Object and replica records
//!
//! Plain data model shared by the lifecycle, store and aggregation layers.

pub mod error;
pub mod merge;
pub mod types;

pub use error::{RecordError, RecordResult};
pub use merge::{ObjectPatch, PinPatch};
pub use types::{
    FileEntry, Network, ObjectRecord, OverallStatus, Pin, PinStatus, ReplicaIdentity,
    ReplicaRecord, ReplicaStatus, DIRECTORY_MEDIA_KIND,
};
