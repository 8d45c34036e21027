//! Metrics aggregation
//!
//! Full scans of the object store folded into global, deduplicated
//! counters partitioned by network and replica status.

mod aggregator;
mod error;
mod types;

pub use aggregator::MetricsAggregator;
pub use error::{AggregateError, AggregateResult};
pub use types::{AggregateReport, AggregationRun, NetworkTotals, ReplicaTotals};
