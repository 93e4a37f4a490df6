use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::entry::CacheItem;
use crate::store::Store;
use crate::utils::{read, write};

/// Thread-safe in-memory store using HashMap with RwLock.
///
/// This is the default store. It never evicts: an entry stays until it is
/// overwritten, removed, or its pending value settles to nothing.
///
/// For a bounded cache, consider using `MokaStore` instead.
pub struct HashMapStore<D> {
    state: RwLock<HashMap<String, Arc<CacheItem<D>>>>,
}

impl<D> HashMapStore<D> {
    /// Create a new, empty HashMapStore.
    pub fn new() -> Self {
        HashMapStore {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        read(&self.state).len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        read(&self.state).is_empty()
    }
}

impl<D> Default for HashMapStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Store<D> for HashMapStore<D>
where
    D: Send + Sync,
{
    fn name(&self) -> &'static str {
        "hashmap"
    }

    fn get(&self, key: &str) -> Option<Arc<CacheItem<D>>> {
        read(&self.state).get(key).cloned()
    }

    fn insert(&self, key: &str, item: Arc<CacheItem<D>>) {
        write(&self.state).insert(key.to_string(), item);
    }

    fn remove(&self, key: &str) -> Option<Arc<CacheItem<D>>> {
        write(&self.state).remove(key)
    }

    fn contains(&self, key: &str) -> bool {
        read(&self.state).contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        read(&self.state).keys().cloned().collect()
    }

    fn clear(&self) {
        write(&self.state).clear();
    }
}
