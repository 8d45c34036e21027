//! Upload registration
//!
//! Hands content to a pinning collaborator and records the resulting object
//! for its owner. Replication is started elsewhere; a fresh upload is always
//! reported as `ongoing`.

mod error;
mod pinning;
mod service;
mod types;

pub use error::{UploadError, UploadResult};
pub use pinning::{LocalPinning, PinningService};
pub use service::UploadService;
pub use types::{PinContent, PinError, PinReceipt, UploadFile, UploadOutcome};
