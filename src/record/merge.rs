//! Field-level merge for object records.
//!
//! A later write for the same owner and object only replaces the fields it
//! carries. Everything it leaves out keeps its stored value.

use crate::record::error::{RecordError, RecordResult};
use crate::record::types::{FileEntry, ObjectRecord, Pin, PinStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PinPatch {
    pub status: Option<PinStatus>,
    pub size_bytes: Option<u64>,
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial object record; every present field overwrites on merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectPatch {
    pub size_bytes: Option<u64>,
    pub media_kind: Option<String>,
    pub files: Option<Vec<FileEntry>>,
    pub pin: Option<PinPatch>,
    pub scope: Option<String>,
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

fn overwrite<T: Clone>(slot: &mut T, incoming: &Option<T>) {
    if let Some(value) = incoming {
        *slot = value.clone();
    }
}

fn overwrite_opt<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) {
    if incoming.is_some() {
        *slot = incoming.clone();
    }
}

impl Pin {
    pub fn apply(&mut self, patch: &PinPatch) {
        overwrite(&mut self.status, &patch.status);
        overwrite_opt(&mut self.size_bytes, &patch.size_bytes);
        overwrite_opt(&mut self.name, &patch.name);
        overwrite(&mut self.created_at, &patch.created_at);
    }
}

impl ObjectRecord {
    /// Merge `patch` into this record, incoming values winning when present.
    pub fn apply(&mut self, patch: &ObjectPatch) {
        overwrite(&mut self.size_bytes, &patch.size_bytes);
        overwrite(&mut self.media_kind, &patch.media_kind);
        overwrite(&mut self.files, &patch.files);
        if let Some(pin) = &patch.pin {
            self.pin.apply(pin);
        }
        overwrite_opt(&mut self.scope, &patch.scope);
        overwrite_opt(&mut self.name, &patch.name);
        overwrite(&mut self.created_at, &patch.created_at);
    }

    /// Build the first stored version of a record from a patch.
    pub fn from_patch(
        owner_key: impl Into<String>,
        object_id: impl Into<String>,
        patch: &ObjectPatch,
    ) -> RecordResult<Self> {
        let now = Utc::now();
        let size_bytes = patch.size_bytes.ok_or(RecordError::MissingField("size"))?;
        let media_kind = patch
            .media_kind
            .clone()
            .ok_or(RecordError::MissingField("type"))?;
        let pin_patch = patch.pin.as_ref().ok_or(RecordError::MissingField("pin"))?;
        let pin_status = pin_patch
            .status
            .ok_or(RecordError::MissingField("pin.status"))?;

        Ok(Self {
            object_id: object_id.into(),
            owner_key: owner_key.into(),
            size_bytes,
            media_kind,
            files: patch.files.clone().unwrap_or_default(),
            pin: Pin {
                status: pin_status,
                size_bytes: pin_patch.size_bytes,
                name: pin_patch.name.clone(),
                created_at: pin_patch.created_at.unwrap_or(now),
            },
            scope: patch.scope.clone(),
            name: patch.name.clone(),
            created_at: patch.created_at.unwrap_or(now),
        })
    }
}

impl From<&ObjectRecord> for ObjectPatch {
    fn from(record: &ObjectRecord) -> Self {
        Self {
            size_bytes: Some(record.size_bytes),
            media_kind: Some(record.media_kind.clone()),
            files: Some(record.files.clone()),
            pin: Some(PinPatch {
                status: Some(record.pin.status),
                size_bytes: record.pin.size_bytes,
                name: record.pin.name.clone(),
                created_at: Some(record.pin.created_at),
            }),
            scope: record.scope.clone(),
            name: record.name.clone(),
            created_at: Some(record.created_at),
        }
    }
}
