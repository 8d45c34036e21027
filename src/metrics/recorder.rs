//! Operational metrics for the aggregation and serving path
//!
//! These describe the service itself (how often it scans, how long scans
//! take, how the response cache behaves), not the stored population.

use crate::aggregate::AggregateReport;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    describe_counter!(
        "abistorage_aggregation_runs_total",
        "Total number of completed aggregation passes"
    );
    describe_counter!(
        "abistorage_aggregation_failures_total",
        "Total number of aggregation passes aborted by a store failure"
    );
    describe_histogram!(
        "abistorage_aggregation_duration_seconds",
        "Wall time of one aggregation pass"
    );
    describe_gauge!(
        "abistorage_aggregation_last_objects",
        "Objects seen by the most recent successful pass"
    );

    describe_counter!(
        "abistorage_metrics_cache_requests_total",
        "Metrics requests by cache outcome"
    );
    describe_counter!(
        "abistorage_metrics_cache_refresh_failures_total",
        "Background refreshes that failed and left the stale entry in place"
    );

    describe_counter!(
        "abistorage_malformed_records_total",
        "Stored records that failed to parse and were resolved conservatively"
    );
}

/// Record a stored record that could not be parsed
pub fn record_malformed(kind: &'static str) {
    counter!("abistorage_malformed_records_total", "kind" => kind).increment(1);
}

/// Record how a metrics request was served (`fresh`, `stale` or `miss`)
pub fn record_cache_outcome(outcome: &'static str) {
    counter!("abistorage_metrics_cache_requests_total", "outcome" => outcome).increment(1);
}

/// Record a failed background refresh
pub fn record_refresh_failed() {
    counter!("abistorage_metrics_cache_refresh_failures_total").increment(1);
}

/// Times one aggregation pass and records its outcome
pub struct AggregationTimer {
    start_time: Instant,
}

impl AggregationTimer {
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Mark the pass as complete
    pub fn complete(self, report: &AggregateReport) {
        counter!("abistorage_aggregation_runs_total").increment(1);
        histogram!("abistorage_aggregation_duration_seconds")
            .record(self.start_time.elapsed().as_secs_f64());
        gauge!("abistorage_aggregation_last_objects").set(report.object_count as f64);
    }

    /// Mark the pass as aborted
    pub fn fail(self) {
        counter!("abistorage_aggregation_failures_total").increment(1);
        histogram!("abistorage_aggregation_duration_seconds")
            .record(self.start_time.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Should not panic when called multiple times
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_aggregation_timer() {
        let timer = AggregationTimer::start();
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed() >= Duration::from_millis(10));
        timer.complete(&AggregateReport::default()); // Should not panic
    }

    #[test]
    fn test_record_helpers_without_recorder() {
        record_malformed("object");
        record_cache_outcome("miss");
        record_refresh_failed();
        AggregationTimer::start().fail();
    }
}
