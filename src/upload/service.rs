use crate::record::{FileEntry, ObjectPatch, OverallStatus, PinPatch, PinStatus, DIRECTORY_MEDIA_KIND};
use crate::store::{ObjectKey, ObjectStore};
use crate::upload::error::{UploadError, UploadResult};
use crate::upload::pinning::PinningService;
use crate::upload::types::{PinContent, PinReceipt, UploadOutcome};
use chrono::Utc;
use std::sync::Arc;

/// Pins uploaded content and registers the object record for its owner.
#[derive(Clone)]
pub struct UploadService {
    store: ObjectStore,
    pinning: Arc<dyn PinningService>,
}

impl UploadService {
    pub fn new(store: ObjectStore, pinning: Arc<dyn PinningService>) -> Self {
        Self { store, pinning }
    }

    pub async fn register(
        &self,
        owner: &str,
        scope: Option<String>,
        content: PinContent,
    ) -> UploadResult<UploadOutcome> {
        if content.is_empty() {
            return Err(UploadError::EmptyPayload);
        }

        let receipt = self.pinning.pin(&content, owner).await.map_err(|e| {
            tracing::warn!(owner, error = %e, "Pinning failed");
            UploadError::UpstreamPinFailure(e.status_text)
        })?;

        let key = ObjectKey::new(owner, receipt.content_id.clone());
        let patch = build_patch(&content, &receipt, scope);
        let record = self.store.put(&key, &patch).await?;
        if self.store.ensure_owner(owner).await? {
            tracing::info!(owner, "New owner registered");
        }

        tracing::info!(
            key = %key,
            size = record.size_bytes,
            directory = record.is_directory(),
            "Upload registered"
        );

        Ok(UploadOutcome {
            record,
            status: OverallStatus::Ongoing,
        })
    }
}

fn build_patch(content: &PinContent, receipt: &PinReceipt, scope: Option<String>) -> ObjectPatch {
    let (size_bytes, media_kind, files) = match content {
        PinContent::Blob { bytes, media_kind } => {
            (bytes.len() as u64, media_kind.clone(), Vec::new())
        }
        PinContent::Files(files) => (
            receipt.size_bytes,
            DIRECTORY_MEDIA_KIND.to_string(),
            files
                .iter()
                .map(|f| FileEntry {
                    name: f.name.clone(),
                    media_kind: f.media_kind.clone(),
                })
                .collect(),
        ),
    };

    ObjectPatch {
        size_bytes: Some(size_bytes),
        media_kind: Some(media_kind),
        files: Some(files),
        pin: Some(PinPatch {
            status: Some(PinStatus::Pinned),
            size_bytes: Some(receipt.size_bytes),
            name: None,
            created_at: Some(receipt.created_at),
        }),
        scope,
        name: None,
        created_at: Some(Utc::now()),
    }
}
