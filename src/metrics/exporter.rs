//! Text exposition of aggregate counters
//!
//! Renders an [`AggregateReport`] in the Prometheus text format. Output is
//! deterministic for a given report: networks appear in first-observed
//! order, statuses within a network in lifecycle order.

use crate::aggregate::AggregateReport;
use crate::metrics::recorder::init_metrics;
use crate::record::ReplicaStatus;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt::Write;
use std::sync::OnceLock;

pub const DEFAULT_PREFIX: &str = "abistorage";

/// Global prometheus handle for operational metrics
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Metric name prefix (default: "abistorage")
    pub prefix: String,

    /// Whether to append the service's own operational metrics
    pub include_process_metrics: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            include_process_metrics: false,
        }
    }
}

/// Install the global recorder for operational metrics
///
/// Returns the handle used to render them. Only the first call installs;
/// later calls return the existing handle.
pub fn install_recorder() -> Result<&'static PrometheusHandle, MetricsError> {
    init_metrics();

    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::SetupFailed(e.to_string()))?;

    let _ = PROMETHEUS_HANDLE.set(handle);
    PROMETHEUS_HANDLE.get().ok_or(MetricsError::AlreadyInitialized)
}

/// Render operational metrics (if a recorder is installed)
pub fn render_process_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Errors from the metrics serving path
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to setup metrics: {0}")]
    SetupFailed(String),

    #[error("Metrics already initialized")]
    AlreadyInitialized,

    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] crate::aggregate::AggregateError),

    #[error("Aggregation task failed: {0}")]
    TaskFailed(String),
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {value}");
}

/// Render a report in the text exposition format
pub fn export(report: &AggregateReport, prefix: &str) -> String {
    let mut out = String::new();

    counter(
        &mut out,
        &format!("{prefix}_users_total"),
        "Total users registered.",
        report.user_count,
    );
    counter(
        &mut out,
        &format!("{prefix}_abis_total"),
        "Total number of ABIs stored.",
        report.object_count,
    );
    counter(
        &mut out,
        &format!("{prefix}_abis_bytes_total"),
        "Total bytes of all ABIs.",
        report.total_bytes,
    );
    counter(
        &mut out,
        &format!("{prefix}_abis_storage_ipfs_total"),
        "Total number of ABIs pinned on IPFS.",
        report.pinned_count,
    );
    counter(
        &mut out,
        &format!("{prefix}_abis_storage_filecoin_total"),
        "Total number of ABIs stored on Filecoin in active deals.",
        report.active_total(),
    );
    counter(
        &mut out,
        &format!("{prefix}_abis_storage_filecoin_queued_total"),
        "Total number of ABIs queued for the next deal batch.",
        report.total_queued,
    );

    for totals in report.replica_totals.iter() {
        let network = totals.network;
        let name = format!("{prefix}_abis_storage_filecoin_abis_{network}_total");
        let _ = writeln!(
            out,
            "# HELP {name} Total number of ABIs participating in Filecoin deals for {network}."
        );
        let _ = writeln!(out, "# TYPE {name} counter");

        for (status, value) in totals.iter() {
            match status {
                // Queued replicas have no network yet; they live in the queued total.
                ReplicaStatus::Queued => continue,
                ReplicaStatus::Unknown if value == 0 => continue,
                _ => {}
            }
            let _ = writeln!(out, "{name}{{status=\"{status}\"}} {value}");
        }
    }

    out
}

/// Render a report plus, if configured, the operational metrics
pub fn render(report: &AggregateReport, config: &ExportConfig) -> String {
    let mut body = export(report, &config.prefix);
    if config.include_process_metrics {
        if let Some(process) = render_process_metrics() {
            body.push_str(&process);
        }
    }
    body
}
