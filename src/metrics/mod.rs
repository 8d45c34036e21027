//! Metrics exposition and observability
//!
//! Two kinds of metrics live here:
//! - Population counters (users, objects, bytes, replicas by network and
//!   status), rendered from an aggregation pass by [`exporter::export`] and
//!   served through the per-origin [`MetricsCache`].
//! - Operational counters about the service itself, recorded through the
//!   `metrics` facade in [`recorder`].

pub mod cache;
pub mod exporter;
pub mod recorder;

pub use cache::{CachePolicy, CacheStatus, CachedMetrics, MetricsCache, DEFAULT_ORIGIN};
pub use exporter::{export, install_recorder, render, ExportConfig, MetricsError, DEFAULT_PREFIX};
pub use recorder::{init_metrics, record_malformed, AggregationTimer};
