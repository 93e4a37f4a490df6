//! Store implementations for the engine.

pub mod memory;
pub mod metrics;
pub mod moka;

pub use memory::HashMapStore;
pub use metrics::{CacheMetric, ItemStatus, MetricsSink, MetricsStore};
pub use moka::{MokaStore, MokaStoreConfig};
