use crate::upload::types::{PinContent, PinError, PinReceipt};
use async_trait::async_trait;
use blake3::Hasher;
use chrono::Utc;

/// Content-addressed pinning collaborator
#[async_trait]
pub trait PinningService: Send + Sync {
    async fn pin(&self, content: &PinContent, owner: &str) -> Result<PinReceipt, PinError>;
}

/// In-process pinning: content ids are BLAKE3 digests, nothing leaves the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalPinning;

impl LocalPinning {
    /// `b3` followed by the hex digest of the content
    pub fn content_id(content: &PinContent) -> String {
        let mut hasher = Hasher::new();
        match content {
            PinContent::Blob { bytes, .. } => {
                hasher.update(bytes);
            }
            PinContent::Files(files) => {
                for file in files {
                    hasher.update(file.name.as_bytes());
                    hasher.update(&[0]);
                    hasher.update(&file.bytes);
                }
            }
        }
        format!("b3{}", hasher.finalize().to_hex())
    }
}

#[async_trait]
impl PinningService for LocalPinning {
    async fn pin(&self, content: &PinContent, owner: &str) -> Result<PinReceipt, PinError> {
        let content_id = Self::content_id(content);
        tracing::debug!(owner, content_id = %content_id, bytes = content.len(), "Pinned locally");
        Ok(PinReceipt {
            content_id,
            size_bytes: content.len(),
            created_at: Utc::now(),
        })
    }
}
