//! Per-origin response cache for the metrics endpoint
//!
//! One entry per serving origin, keyed `"{origin}/metrics"`. Only configured
//! origins get their own entry; any other host shares [`DEFAULT_ORIGIN`], so
//! the number of entries and scans per window is bounded. A fresh entry
//! is served without touching the aggregator. A stale entry inside the
//! revalidation window is served as-is while one background refresh runs
//! for that origin. Anything older is a miss.
//!
//! Misses aggregate on a spawned task, so a request that goes away does
//! not cancel the scan and the result still warms the cache. A failed
//! aggregation never writes an entry.

use crate::aggregate::MetricsAggregator;
use crate::metrics::exporter::{render, ExportConfig, MetricsError};
use crate::metrics::recorder;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(600);
pub const DEFAULT_STALE_WHILE_REVALIDATE: Duration = Duration::from_secs(3600);

/// Origin used for every host outside the configured set
pub const DEFAULT_ORIGIN: &str = "default";

/// Freshness window and stale allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age: Duration,
    pub stale_while_revalidate: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            stale_while_revalidate: DEFAULT_STALE_WHILE_REVALIDATE,
        }
    }
}

impl CachePolicy {
    /// Value for the response `Cache-Control` header
    pub fn cache_control(&self) -> String {
        format!(
            "public,max-age={},stale-while-revalidate={}",
            self.max_age.as_secs(),
            self.stale_while_revalidate.as_secs()
        )
    }

    fn classify(&self, age: Duration) -> CacheStatus {
        if age < self.max_age {
            CacheStatus::Fresh
        } else if age < self.max_age + self.stale_while_revalidate {
            CacheStatus::Stale
        } else {
            CacheStatus::Miss
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Stale,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Fresh => "fresh",
            CacheStatus::Stale => "stale",
            CacheStatus::Miss => "miss",
        }
    }
}

/// A rendered metrics body and how it was obtained
#[derive(Debug, Clone)]
pub struct CachedMetrics {
    pub body: Arc<str>,
    pub status: CacheStatus,
    pub age: Duration,
}

#[derive(Clone)]
struct CacheEntry {
    body: Arc<str>,
    generated_at: Instant,
}

struct CacheInner {
    aggregator: MetricsAggregator,
    export: ExportConfig,
    policy: CachePolicy,
    origins: HashSet<String>,
    entries: DashMap<String, CacheEntry>,
    revalidating: DashMap<String, ()>,
}

impl CacheInner {
    async fn refresh(&self, key: &str) -> Result<Arc<str>, MetricsError> {
        let report = self.aggregator.aggregate().await?;
        let body: Arc<str> = render(&report, &self.export).into();

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                body: body.clone(),
                generated_at: Instant::now(),
            },
        );
        tracing::debug!(key, bytes = body.len(), "Metrics cache entry stored");
        Ok(body)
    }
}

/// Clears the in-flight marker however the refresh task ends.
struct RevalidateGuard {
    inner: Arc<CacheInner>,
    key: String,
}

impl Drop for RevalidateGuard {
    fn drop(&mut self) {
        self.inner.revalidating.remove(&self.key);
    }
}

#[derive(Clone)]
pub struct MetricsCache {
    inner: Arc<CacheInner>,
}

impl MetricsCache {
    pub fn new(aggregator: MetricsAggregator, export: ExportConfig, policy: CachePolicy) -> Self {
        Self::with_origins(aggregator, export, policy, Vec::new())
    }

    pub fn with_origins(
        aggregator: MetricsAggregator,
        export: ExportConfig,
        policy: CachePolicy,
        origins: Vec<String>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                aggregator,
                export,
                policy,
                origins: origins.iter().map(|o| o.to_ascii_lowercase()).collect(),
                entries: DashMap::new(),
                revalidating: DashMap::new(),
            }),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.inner.policy
    }

    pub fn export_config(&self) -> &ExportConfig {
        &self.inner.export
    }

    /// Map a request host onto the origin whose entry serves it
    pub fn origin_for<'a>(&'a self, host: &str) -> &'a str {
        self.inner
            .origins
            .get(&host.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or(DEFAULT_ORIGIN)
    }

    pub fn cache_key(origin: &str) -> String {
        format!("{origin}/metrics")
    }

    /// Serve the metrics body for the origin that `host` maps to
    pub async fn get(&self, host: &str) -> Result<CachedMetrics, MetricsError> {
        let key = Self::cache_key(self.origin_for(host));

        // Clone out so no map guard is held across an await.
        let cached = self.inner.entries.get(&key).map(|e| e.clone());
        if let Some(entry) = cached {
            let age = entry.generated_at.elapsed();
            match self.inner.policy.classify(age) {
                CacheStatus::Fresh => {
                    recorder::record_cache_outcome("fresh");
                    return Ok(CachedMetrics {
                        body: entry.body,
                        status: CacheStatus::Fresh,
                        age,
                    });
                }
                CacheStatus::Stale => {
                    recorder::record_cache_outcome("stale");
                    self.spawn_revalidate(key);
                    return Ok(CachedMetrics {
                        body: entry.body,
                        status: CacheStatus::Stale,
                        age,
                    });
                }
                CacheStatus::Miss => {
                    tracing::debug!(key = %key, age_secs = age.as_secs(), "Metrics cache entry expired");
                }
            }
        }

        recorder::record_cache_outcome("miss");
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { inner.refresh(&key).await });
        let body = handle
            .await
            .map_err(|e| MetricsError::TaskFailed(e.to_string()))??;

        Ok(CachedMetrics {
            body,
            status: CacheStatus::Miss,
            age: Duration::ZERO,
        })
    }

    /// At most one background refresh per key
    fn spawn_revalidate(&self, key: String) {
        if self.inner.revalidating.insert(key.clone(), ()).is_some() {
            return;
        }

        let guard = RevalidateGuard {
            inner: self.inner.clone(),
            key,
        };
        tokio::spawn(async move {
            if let Err(e) = guard.inner.refresh(&guard.key).await {
                tracing::warn!(key = %guard.key, error = %e, "Background metrics refresh failed");
                recorder::record_refresh_failed();
            }
        });
    }

    pub fn is_revalidating(&self, host: &str) -> bool {
        self.inner
            .revalidating
            .contains_key(&Self::cache_key(self.origin_for(host)))
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}
