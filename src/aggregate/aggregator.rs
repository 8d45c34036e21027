use crate::aggregate::error::{AggregateError, AggregateResult};
use crate::aggregate::types::{AggregateReport, AggregationRun};
use crate::metrics::recorder::AggregationTimer;
use crate::store::{ObjectStore, StoreError, StoreResult};
use futures::TryStreamExt;

/// Scans the whole object store and produces global lifecycle counters.
///
/// Every call is an independent full pass with its own deduplication state.
/// Two concurrent calls both read the store and both return correct
/// results. A failed store call aborts the pass; there is no partial
/// result and no retry.
#[derive(Clone)]
pub struct MetricsAggregator {
    store: ObjectStore,
}

impl MetricsAggregator {
    pub fn new(store: ObjectStore) -> Self {
        Self { store }
    }

    pub async fn aggregate(&self) -> AggregateResult<AggregateReport> {
        let timer = AggregationTimer::start();

        // Owner and object scans have no ordering between them.
        let result = tokio::try_join!(self.store.count_owners(), self.scan_objects());

        match result {
            Ok((user_count, mut report)) => {
                report.user_count = user_count;
                tracing::info!(
                    users = report.user_count,
                    objects = report.object_count,
                    bytes = report.total_bytes,
                    pinned = report.pinned_count,
                    queued = report.total_queued,
                    active = report.active_total(),
                    elapsed_ms = timer.elapsed().as_millis() as u64,
                    "Aggregation complete"
                );
                timer.complete(&report);
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Aggregation aborted");
                timer.fail();
                Err(AggregateError::StoreReadFailure(e))
            }
        }
    }

    async fn scan_objects(&self) -> StoreResult<AggregateReport> {
        let concurrency = self.store.scan_config().fetch_concurrency.max(1);
        let store = self.store.clone();

        let mut entries = Box::pin(
            self.store
                .list_entries("")
                .map_ok(move |listed| {
                    let store = store.clone();
                    async move {
                        let replicas = store.replicas(&listed.record.object_id).await?;
                        Ok::<_, StoreError>((listed, replicas))
                    }
                })
                .try_buffered(concurrency),
        );

        let mut run = AggregationRun::new();
        while let Some((listed, replicas)) = entries.try_next().await? {
            if !run.fold(&listed.key, &listed.record, &replicas) {
                tracing::debug!(key = %listed.key, "Key repeated across pages, skipped");
            }
        }
        Ok(run.finish())
    }
}
