//! abistorage
//!
//! Object registry for uploaded ABI bundles with Filecoin-style replica
//! tracking. Objects are pinned on upload, replicated out-of-band, and
//! summarised by a deduplicating full-store aggregation served as
//! Prometheus text behind a per-origin cache.

pub mod aggregate;
pub mod api;
pub mod auth;
pub mod config;
pub mod lifecycle;
pub mod metrics;
pub mod record;
pub mod store;
pub mod upload;
