use std::sync::Arc;

use crate::entry::CacheItem;

/// A store is a common interface for holding cache items by resolved key.
///
/// Stores are plain keyed maps. They know nothing about pending values,
/// subscribers or expiration policy; [`CacheStore`](crate::CacheStore) layers
/// the resolution protocol and broadcasting on top of them.
///
/// All operations are synchronous so that the cache store can keep its writes
/// atomic with respect to each other.
pub trait Store<D>: Send + Sync {
    /// A name for metrics/tracing.
    ///
    /// # Example
    /// - "hashmap"
    /// - "moka"
    /// - "metrics"
    fn name(&self) -> &'static str;

    /// Return the stored item, or `None` if the key is absent.
    fn get(&self, key: &str) -> Option<Arc<CacheItem<D>>>;

    /// Store the item, replacing any prior entry for that key.
    fn insert(&self, key: &str, item: Arc<CacheItem<D>>);

    /// Remove the key. Returns the removed item, if any.
    fn remove(&self, key: &str) -> Option<Arc<CacheItem<D>>>;

    /// Check whether the key is present.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All keys currently stored, in no particular order.
    fn keys(&self) -> Vec<String>;

    /// Remove every entry.
    fn clear(&self);
}
