use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::entry::CacheItem;
use crate::store::Store;

/// Configuration for MokaStore.
#[derive(Debug, Clone)]
pub struct MokaStoreConfig {
    /// Maximum number of entries the cache can hold.
    pub max_capacity: u64,

    /// Time to idle: entries are evicted if not accessed within this duration.
    /// `None` means entries don't expire based on idle time.
    ///
    /// This is storage eviction only. Freshness for revalidation is decided by
    /// each item's `expires_at`.
    pub time_to_idle: Option<Duration>,
}

impl Default for MokaStoreConfig {
    fn default() -> Self {
        MokaStoreConfig {
            max_capacity: 10_000,
            time_to_idle: None,
        }
    }
}

/// Bounded concurrent store using Moka.
///
/// MokaStore provides:
/// - Lock-free concurrent access for reads and writes
/// - Size-bounded eviction, optionally combined with idle eviction
///
/// An evicted key behaves like a key that was never set: the next
/// revalidation for it issues a fetch.
pub struct MokaStore<D> {
    cache: Cache<String, Arc<CacheItem<D>>>,
}

impl<D> MokaStore<D>
where
    D: Send + Sync + 'static,
{
    /// Create a new MokaStore with the given configuration.
    ///
    /// # Example
    /// ```ignore
    /// let config = MokaStoreConfig {
    ///     max_capacity: 10_000,
    ///     time_to_idle: Some(Duration::from_secs(600)),
    /// };
    /// let store: MokaStore<User> = MokaStore::new(config);
    /// ```
    pub fn new(config: MokaStoreConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);

        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        MokaStore {
            cache: builder.build(),
        }
    }

    /// Get cache statistics (for monitoring/debugging).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl<D> Store<D> for MokaStore<D>
where
    D: Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "moka"
    }

    fn get(&self, key: &str) -> Option<Arc<CacheItem<D>>> {
        self.cache.get(&key.to_string())
    }

    fn insert(&self, key: &str, item: Arc<CacheItem<D>>) {
        // Moka handles eviction automatically based on capacity
        self.cache.insert(key.to_string(), item);
    }

    fn remove(&self, key: &str) -> Option<Arc<CacheItem<D>>> {
        self.cache.remove(&key.to_string())
    }

    fn contains(&self, key: &str) -> bool {
        self.cache.contains_key(&key.to_string())
    }

    fn keys(&self) -> Vec<String> {
        self.cache.iter().map(|(key, _)| key.as_ref().clone()).collect()
    }

    fn clear(&self) {
        self.cache.invalidate_all();
    }
}
