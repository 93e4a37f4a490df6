use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::channel::{Channel, Subscription};
use crate::entry::CacheItem;
use crate::store::Store;
use crate::stores::memory::HashMapStore;
use crate::utils::{lock, now_ms};

/// Keyed cache of items with per-key change broadcast.
///
/// `CacheStore` combines a [`Store`] backend with a [`Channel`] of value
/// changes. Every `set` runs the resolution protocol:
/// - a settled item is broadcast to the key's subscribers immediately
/// - a pending item is settled on a spawned task: a value is written into the
///   item in place and broadcast, an outcome of nothing removes the key silently
/// - an empty item removes the key silently
///
/// A value classified as absent (by default a JSON `null`; see
/// [`with_absent`](Self::with_absent)) is handled like an empty item.
///
/// Writes are serialized through a gate so compound "decide, then write"
/// steps stay atomic. Subscriber callbacks never run under the gate.
pub struct CacheStore<D> {
    store: Arc<dyn Store<D>>,
    channel: Arc<Channel<Option<D>>>,
    gate: Arc<Mutex<()>>,
    absent: AbsentFn<D>,
}

type AbsentFn<D> = Arc<dyn Fn(&D) -> bool + Send + Sync>;

/// Default absence check: only a JSON `null` counts as no value.
fn is_json_null<D: 'static>(value: &D) -> bool {
    (value as &dyn Any)
        .downcast_ref::<serde_json::Value>()
        .is_some_and(serde_json::Value::is_null)
}

impl<D> Clone for CacheStore<D> {
    fn clone(&self) -> Self {
        CacheStore {
            store: Arc::clone(&self.store),
            channel: Arc::clone(&self.channel),
            gate: Arc::clone(&self.gate),
            absent: Arc::clone(&self.absent),
        }
    }
}

impl<D> CacheStore<D>
where
    D: Clone + Send + Sync + 'static,
{
    /// Create a cache backed by a `HashMapStore`.
    pub fn new() -> Self {
        Self::with_store(Arc::new(HashMapStore::new()))
    }

    /// Create a cache on top of the given store.
    ///
    /// # Example
    /// ```ignore
    /// let moka = Arc::new(MokaStore::new(MokaStoreConfig::default()));
    /// let cache: CacheStore<User> = CacheStore::with_store(moka);
    /// ```
    pub fn with_store(store: Arc<dyn Store<D>>) -> Self {
        CacheStore {
            store,
            channel: Arc::new(Channel::new()),
            gate: Arc::new(Mutex::new(())),
            absent: Arc::new(is_json_null::<D>),
        }
    }

    /// Classify values for which `is_absent` returns true as "no value":
    /// settling to one removes the key without a broadcast.
    ///
    /// # Example
    /// ```ignore
    /// let cache = CacheStore::<Option<User>>::new().with_absent(Option::is_none);
    /// ```
    pub fn with_absent<F>(mut self, is_absent: F) -> Self
    where
        F: Fn(&D) -> bool + Send + Sync + 'static,
    {
        self.absent = Arc::new(is_absent);
        self
    }

    /// Name of the backing store.
    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Check whether the key holds a value or a pending value.
    pub fn has(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    /// Return the stored item.
    ///
    /// Returns `None` for absent keys.
    pub fn get(&self, key: &str) -> Option<Arc<CacheItem<D>>> {
        self.store.get(key)
    }

    /// All keys currently present.
    pub fn keys(&self) -> Vec<String> {
        self.store.keys()
    }

    /// Store the item, replacing any prior entry, and resolve it.
    ///
    /// Settled values are broadcast before this returns. Pending values are
    /// settled on a spawned tokio task.
    pub fn set(&self, key: &str, item: impl Into<Arc<CacheItem<D>>>) {
        let item = item.into();
        {
            let _gate = lock(&self.gate);
            self.store.insert(key, Arc::clone(&item));
        }
        self.resolve(key, item);
    }

    /// Store a freshly built item unless the key holds an unexpired entry.
    ///
    /// `make_item` receives the entry being replaced, if any. The check and the
    /// write happen under the gate, so of two concurrent callers only the first
    /// writes. Returns the written item.
    pub(crate) fn set_unless_fresh<F>(
        &self,
        key: &str,
        force: bool,
        make_item: F,
    ) -> Option<Arc<CacheItem<D>>>
    where
        F: FnOnce(Option<&CacheItem<D>>) -> CacheItem<D>,
    {
        let item = {
            let _gate = lock(&self.gate);
            let existing = self.store.get(key);
            if !force
                && let Some(existing) = &existing
                && !existing.has_expired(now_ms())
            {
                return None;
            }
            let item = Arc::new(make_item(existing.as_deref()));
            self.store.insert(key, Arc::clone(&item));
            item
        };
        self.resolve(key, Arc::clone(&item));
        Some(item)
    }

    /// Delete the key.
    ///
    /// With `broadcast`, subscribers are told the value is gone (a `None`
    /// payload) while the entry is still present, then it is deleted.
    pub fn remove(&self, key: &str, broadcast: bool) {
        if broadcast {
            self.channel.broadcast(key, &None);
        }
        let _gate = lock(&self.gate);
        self.store.remove(key);
    }

    /// Delete every entry, optionally broadcasting `None` for each key first.
    pub fn clear(&self, broadcast: bool) {
        if broadcast {
            for key in self.store.keys() {
                self.channel.broadcast(&key, &None);
            }
        }
        let _gate = lock(&self.gate);
        self.store.clear();
    }

    /// Register `callback` for value changes of `key`.
    ///
    /// The callback receives the new value, or `None` when the key was removed
    /// with broadcast.
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn(Option<&D>) + Send + Sync + 'static,
    {
        self.channel
            .subscribe(key, move |payload: &Option<D>| callback(payload.as_ref()))
    }

    /// Remove a subscription. Returns `false` if it was not registered under `key`.
    pub fn unsubscribe(&self, key: &str, handle: Subscription) -> bool {
        self.channel.unsubscribe(key, handle)
    }

    /// Publish `value` to every live subscriber of `key`.
    pub fn broadcast(&self, key: &str, value: Option<D>) -> usize {
        self.channel.broadcast(key, &value)
    }

    /// Number of live subscribers for `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.channel.subscriber_count(key)
    }

    fn resolve(&self, key: &str, item: Arc<CacheItem<D>>) {
        if let Some(future) = item.take_pending() {
            let cache = self.clone();
            let key = key.to_string();
            let settle = async move {
                let value = future.await;
                cache.settle(&key, &item, value);
            };

            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(settle);
                }
                Err(_) => {
                    tracing::warn!("no tokio runtime, settling pending item inline");
                    futures::executor::block_on(settle);
                }
            }
            return;
        }

        // An item stored twice is settled by the first store only.
        if item.is_resolving() {
            return;
        }

        match item.data().filter(|value| !(self.absent)(value)) {
            Some(value) => {
                self.channel.broadcast(key, &Some(value));
            }
            None => {
                let _gate = lock(&self.gate);
                self.store.remove(key);
            }
        }
    }

    /// Apply the outcome of a pending item.
    ///
    /// Keyed by string, not by item: a late settlement still broadcasts to the
    /// key, and settling to nothing removes whatever the key holds now.
    fn settle(&self, key: &str, item: &CacheItem<D>, value: Option<D>) {
        match value.filter(|value| !(self.absent)(value)) {
            Some(value) => {
                tracing::debug!(key, "pending value settled");
                item.fill(Some(value.clone()));
                self.channel.broadcast(key, &Some(value));
            }
            None => {
                tracing::debug!(key, "pending value settled to nothing, removing key");
                {
                    let _gate = lock(&self.gate);
                    self.store.remove(key);
                }
                item.fill(None);
            }
        }
        item.finish();
    }
}

impl<D> Default for CacheStore<D>
where
    D: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
