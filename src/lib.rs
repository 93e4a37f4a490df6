//! swr-engine - A stale-while-revalidate (SWR) data-fetching engine for Rust
//!
//! This library provides:
//! - Stale-while-revalidate reads: cached data is returned immediately while a
//!   fresh fetch runs in the background
//! - Deduplication of revalidations within a time window
//! - Optimistic mutation with follow-up revalidation
//! - Per-key broadcast of value changes and fetch errors
//! - Pluggable store backends (HashMap, Moka, metrics wrapper)
//!
//! # Example
//!
//! ```ignore
//! use swr_engine::{from_fn, MutateOptions, MutateValue, SwrBuilder, SwrOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let swr = SwrBuilder::new()
//!         .fetcher(from_fn(|key| async move { api::get_todos(&key).await }))
//!         .build();
//!
//!     swr.cache().subscribe("/api/todos", |todos| println!("todos: {:?}", todos));
//!
//!     // Returns whatever is cached and revalidates in the background.
//!     let todos = swr.read(&"/api/todos".into(), &SwrOptions::new());
//!
//!     // Optimistic update, then refetch to confirm.
//!     swr.mutate(
//!         Some("/api/todos"),
//!         MutateValue::update(|prev| with_new_todo(prev)),
//!         &MutateOptions::new(),
//!     );
//! }
//! ```

mod builder;
mod cache;
mod channel;
mod entry;
mod error;
mod fetcher;
mod key;
mod options;
mod store;
pub mod stores;
mod swr;
mod utils;

// Re-export public API
pub use builder::{SwrBuilder, global, reset_global};
pub use cache::CacheStore;
pub use channel::{Channel, Subscription};
pub use entry::CacheItem;
pub use error::{FetchError, KeyError};
#[cfg(feature = "http")]
pub use fetcher::HttpFetcher;
pub use fetcher::{Fetcher, FnFetcher, from_fn, request_data};
pub use key::{KeySpec, resolve_key, resolve_page_key};
pub use options::{
    DEFAULT_DEDUPING_INTERVAL, DEFAULT_FOCUS_THROTTLE_INTERVAL, MutateOptions, RevalidateOptions,
    SwrConfig, SwrOptions, SwrSettings, Trigger,
};
pub use store::Store;
pub use stores::memory::HashMapStore;
pub use stores::metrics::{CacheMetric, ItemStatus, MetricsSink, MetricsStore};
pub use stores::moka::{MokaStore, MokaStoreConfig};
pub use swr::{MutateValue, Swr};
pub use utils::now_ms;
