use crate::lifecycle::ReplicaSet;
use crate::record::{Network, ObjectRecord, ReplicaIdentity, ReplicaStatus};
use std::collections::HashSet;

/// Per-status replica counts for one network, indexed by enumeration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTotals {
    pub network: Network,
    counts: [u64; ReplicaStatus::COUNT],
}

impl NetworkTotals {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            counts: [0; ReplicaStatus::COUNT],
        }
    }

    pub fn get(&self, status: ReplicaStatus) -> u64 {
        self.counts[status.index()]
    }

    fn increment(&mut self, status: ReplicaStatus) {
        self.counts[status.index()] += 1;
    }

    /// Buckets in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (ReplicaStatus, u64)> + '_ {
        ReplicaStatus::ALL.iter().map(|s| (*s, self.get(*s)))
    }
}

/// Replica counts keyed by network, then status.
///
/// Networks keep the order in which they were first observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaTotals {
    networks: Vec<NetworkTotals>,
}

impl ReplicaTotals {
    pub fn record(&mut self, network: Network, status: ReplicaStatus) {
        let idx = match self.networks.iter().position(|n| n.network == network) {
            Some(idx) => idx,
            None => {
                self.networks.push(NetworkTotals::new(network));
                self.networks.len() - 1
            }
        };
        self.networks[idx].increment(status);
    }

    pub fn network(&self, network: Network) -> Option<&NetworkTotals> {
        self.networks.iter().find(|n| n.network == network)
    }

    pub fn get(&self, network: Network, status: ReplicaStatus) -> u64 {
        self.network(network).map(|n| n.get(status)).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkTotals> {
        self.networks.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Sum of the `active` bucket across all networks.
    pub fn active_total(&self) -> u64 {
        self.networks
            .iter()
            .map(|n| n.get(ReplicaStatus::Active))
            .sum()
    }
}

/// Point-in-time counters over every stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateReport {
    pub user_count: u64,
    pub object_count: u64,
    pub total_bytes: u64,
    pub pinned_count: u64,
    /// Replicas still waiting for a node, across all networks.
    pub total_queued: u64,
    pub replica_totals: ReplicaTotals,
}

impl AggregateReport {
    pub fn active_total(&self) -> u64 {
        self.replica_totals.active_total()
    }
}

/// Running state of one aggregation pass.
///
/// The seen sets live only as long as the pass; nothing carries over
/// between runs.
#[derive(Debug, Default)]
pub struct AggregationRun {
    report: AggregateReport,
    seen_objects: HashSet<String>,
    seen_replicas: HashSet<ReplicaIdentity>,
}

impl AggregationRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one listed object and its replicas into the running totals.
    ///
    /// Returns false when the key was already folded in this pass.
    pub fn fold(&mut self, key: &str, record: &ObjectRecord, replicas: &ReplicaSet) -> bool {
        if !self.seen_objects.insert(key.to_string()) {
            return false;
        }

        let report = &mut self.report;
        report.object_count += 1;
        report.total_bytes = report.total_bytes.saturating_add(record.size_bytes);
        if record.is_pinned() {
            report.pinned_count += 1;
        }

        for replica in &replicas.records {
            if !self.seen_replicas.insert(replica.identity()) {
                continue;
            }
            if replica.status == ReplicaStatus::Queued {
                report.total_queued += 1;
            } else {
                report.replica_totals.record(replica.network, replica.status);
            }
        }
        true
    }

    pub fn finish(self) -> AggregateReport {
        self.report
    }
}
