//! Metrics middleware for cache stores.
//!
//! This module provides a `MetricsStore` wrapper that emits metrics for all
//! store operations (reads, writes, removes, clears) to a user-provided sink.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use swr_engine::{HashMapStore, SwrBuilder};
//! use swr_engine::stores::metrics::{MetricsSink, MetricsStore};
//!
//! let sink = Arc::new(MyMetricsSink::new());
//! let store = Arc::new(MetricsStore::new(Arc::new(HashMapStore::new()), sink.clone()));
//!
//! let swr = SwrBuilder::<User>::new().store(store).build();
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::entry::CacheItem;
use crate::store::Store;
use crate::utils::now_ms;

/// Status of a cache item on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    /// A fetch for the item is still in flight.
    Pending,
    /// The item has not expired yet; revalidation would be deduplicated.
    Fresh,
    /// The item has expired (or never had an expiration).
    Stale,
}

impl ItemStatus {
    fn of<D>(item: &CacheItem<D>, now_ms: i64) -> Self {
        if item.is_resolving() {
            ItemStatus::Pending
        } else if item.has_expired(now_ms) {
            ItemStatus::Stale
        } else {
            ItemStatus::Fresh
        }
    }
}

/// Metrics emitted by the MetricsStore wrapper.
#[derive(Debug, Clone)]
pub enum CacheMetric {
    /// Emitted on every read (get) operation.
    Read {
        /// The key that was read.
        key: String,
        /// Whether the key was found.
        hit: bool,
        /// Status of the item (only present when hit=true).
        status: Option<ItemStatus>,
        /// Latency of the operation in milliseconds.
        latency_ms: f64,
        /// Name of the wrapped store (from Store::name()).
        tier: String,
    },
    /// Emitted on every write (insert) operation.
    Write {
        key: String,
        latency_ms: f64,
        tier: String,
    },
    /// Emitted on every remove operation.
    Remove {
        key: String,
        /// Whether an entry was actually removed.
        existed: bool,
        latency_ms: f64,
        tier: String,
    },
    /// Emitted when the whole store is cleared.
    Clear { latency_ms: f64, tier: String },
}

/// Trait for receiving cache metrics.
///
/// Implement this trait to collect metrics from `MetricsStore`.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Emit a single metric.
    ///
    /// This is called synchronously in the hot path of cache operations.
    /// Implementations should be fast (e.g., buffer metrics in memory).
    fn emit(&self, metric: CacheMetric);

    /// Flush any buffered metrics.
    ///
    /// Called when the caller wants to ensure all metrics are persisted.
    async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A store wrapper that emits metrics for all operations.
pub struct MetricsStore<D> {
    inner: Arc<dyn Store<D>>,
    sink: Arc<dyn MetricsSink>,
    tier_name: String,
}

impl<D> MetricsStore<D> {
    /// Create a new MetricsStore wrapping the given store.
    pub fn new(inner: Arc<dyn Store<D>>, sink: Arc<dyn MetricsSink>) -> Self {
        let tier_name = inner.name().to_string();
        MetricsStore {
            inner,
            sink,
            tier_name,
        }
    }

    /// Get a reference to the metrics sink.
    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    fn elapsed_ms(start: Instant) -> f64 {
        start.elapsed().as_secs_f64() * 1000.0
    }
}

impl<D> Store<D> for MetricsStore<D>
where
    D: Send + Sync,
{
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn get(&self, key: &str) -> Option<Arc<CacheItem<D>>> {
        let start = Instant::now();
        let result = self.inner.get(key);
        let latency_ms = Self::elapsed_ms(start);

        let status = result.as_deref().map(|item| ItemStatus::of(item, now_ms()));

        self.sink.emit(CacheMetric::Read {
            key: key.to_string(),
            hit: result.is_some(),
            status,
            latency_ms,
            tier: self.tier_name.clone(),
        });

        result
    }

    fn insert(&self, key: &str, item: Arc<CacheItem<D>>) {
        let start = Instant::now();
        self.inner.insert(key, item);

        self.sink.emit(CacheMetric::Write {
            key: key.to_string(),
            latency_ms: Self::elapsed_ms(start),
            tier: self.tier_name.clone(),
        });
    }

    fn remove(&self, key: &str) -> Option<Arc<CacheItem<D>>> {
        let start = Instant::now();
        let removed = self.inner.remove(key);

        self.sink.emit(CacheMetric::Remove {
            key: key.to_string(),
            existed: removed.is_some(),
            latency_ms: Self::elapsed_ms(start),
            tier: self.tier_name.clone(),
        });

        removed
    }

    fn contains(&self, key: &str) -> bool {
        self.inner.contains(key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    fn clear(&self) {
        let start = Instant::now();
        self.inner.clear();

        self.sink.emit(CacheMetric::Clear {
            latency_ms: Self::elapsed_ms(start),
            tier: self.tier_name.clone(),
        });
    }
}
