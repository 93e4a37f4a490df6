use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::cache::CacheStore;
use crate::channel::{Channel, Subscription};
use crate::entry::CacheItem;
use crate::error::FetchError;
use crate::fetcher::{Fetcher, request_data};
use crate::key::{KeySpec, resolve_key, resolve_page_key};
use crate::options::{MutateOptions, RevalidateOptions, SwrConfig, SwrOptions};
use crate::utils::{duration_ms, lock, now_ms};

/// Value written by [`Swr::mutate`].
pub enum MutateValue<D> {
    /// A literal value, stored with no expiration.
    Value(D),
    /// Derive the new value from the current settled value (`None` if absent
    /// or pending). Returning `None` removes the key.
    Update(Box<dyn FnOnce(Option<&D>) -> Option<D>>),
    /// A prebuilt item, stored as-is. Use it for custom expiration or for a
    /// pending value.
    Item(Arc<CacheItem<D>>),
}

impl<D> MutateValue<D> {
    pub fn value(value: D) -> Self {
        MutateValue::Value(value)
    }

    /// Derive the new value from the current one.
    ///
    /// # Example
    /// ```ignore
    /// swr.mutate(Some("/api/counter"), MutateValue::update(|prev| prev.copied().unwrap_or(0) + 1), &opts);
    /// ```
    pub fn update<F>(f: F) -> Self
    where
        F: FnOnce(Option<&D>) -> D + 'static,
    {
        MutateValue::Update(Box::new(move |prev| Some(f(prev))))
    }

    /// Like [`update`](Self::update), but `None` removes the key.
    pub fn update_or_remove<F>(f: F) -> Self
    where
        F: FnOnce(Option<&D>) -> Option<D> + 'static,
    {
        MutateValue::Update(Box::new(f))
    }

    /// A value still being computed. Subscribers are notified when it settles.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Option<D>> + Send + 'static,
    {
        MutateValue::Item(Arc::new(CacheItem::pending(future, None)))
    }
}

impl<D> From<CacheItem<D>> for MutateValue<D> {
    fn from(item: CacheItem<D>) -> Self {
        MutateValue::Item(Arc::new(item))
    }
}

impl<D> From<Arc<CacheItem<D>>> for MutateValue<D> {
    fn from(item: Arc<CacheItem<D>>) -> Self {
        MutateValue::Item(item)
    }
}

/// Stale-while-revalidate engine.
///
/// An engine owns its cache store, its error channel and its global options.
/// Clones share all of them; separately built engines share nothing.
///
/// # Example
///
/// ```ignore
/// let swr: Swr<User> = SwrBuilder::new()
///     .fetcher(from_fn(|key| async move { api.get_user(&key).await }))
///     .build();
///
/// swr.cache().subscribe("/api/user/1", |user| println!("user changed: {:?}", user));
/// let stale = swr.read(&"/api/user/1".into(), &SwrOptions::new());
/// ```
pub struct Swr<D> {
    cache: CacheStore<D>,
    errors: Arc<Channel<FetchError>>,
    config: Arc<SwrConfig<D>>,
    /// Last focus revalidation per key, for throttling.
    focus_revalidated: Arc<Mutex<HashMap<String, i64>>>,
}

impl<D> Clone for Swr<D> {
    fn clone(&self) -> Self {
        Swr {
            cache: self.cache.clone(),
            errors: Arc::clone(&self.errors),
            config: Arc::clone(&self.config),
            focus_revalidated: Arc::clone(&self.focus_revalidated),
        }
    }
}

impl<D> Swr<D>
where
    D: Clone + Send + Sync + 'static,
{
    /// Create an engine over `cache` with fully resolved global options.
    pub fn new(cache: CacheStore<D>, config: SwrConfig<D>) -> Self {
        Swr {
            cache,
            errors: Arc::new(Channel::new()),
            config: Arc::new(config),
            focus_revalidated: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The engine's cache store.
    pub fn cache(&self) -> &CacheStore<D> {
        &self.cache
    }

    /// The engine's global options.
    pub fn config(&self) -> &SwrConfig<D> {
        &self.config
    }

    /// Register `callback` for fetch failures of `key`.
    pub fn subscribe_errors<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn(&FetchError) + Send + Sync + 'static,
    {
        self.errors.subscribe(key, callback)
    }

    /// Remove an error subscription.
    pub fn unsubscribe_errors(&self, key: &str, handle: Subscription) -> bool {
        self.errors.unsubscribe(key, handle)
    }

    /// Fetch `key` with `fetcher`, publishing failure on the error channel.
    ///
    /// Resolves to `None` when the fetch fails.
    pub async fn request_data(&self, key: &str, fetcher: &dyn Fetcher<D>) -> Option<D> {
        request_data(key, fetcher, &self.errors).await
    }

    /// Decide whether to fetch `key` and, if so, write the in-flight fetch.
    ///
    /// A fetch is issued when `force` is set, the key is absent, or its entry
    /// has expired. The pending entry expires after the dedup window, so
    /// further revalidations within the window are skipped. Returns the
    /// pending item when a fetch was issued.
    ///
    /// This writes through the cache store directly and never re-enters
    /// [`mutate`](Self::mutate), so a mutate/revalidate pair always terminates.
    pub fn revalidate(
        &self,
        key: Option<&str>,
        options: &RevalidateOptions<D>,
    ) -> Option<Arc<CacheItem<D>>> {
        let key = key?;
        let interval = options
            .deduping_interval
            .unwrap_or(self.config.deduping_interval);

        let Some(fetcher) = options
            .fetcher
            .clone()
            .or_else(|| self.config.fetcher.clone())
        else {
            let wanted = options.force
                || self
                    .cache
                    .get(key)
                    .is_none_or(|item| item.has_expired(now_ms()));
            if wanted {
                tracing::warn!(key, "revalidation skipped: no fetcher configured");
                self.errors.broadcast(key, &FetchError::MissingFetcher);
            }
            return None;
        };

        let errors = Arc::clone(&self.errors);
        let fetch_key = key.to_string();
        let item = self.cache.set_unless_fresh(key, options.force, move |existing| {
            let expires_at = now_ms().saturating_add(duration_ms(interval));
            let stale = existing.and_then(|item| item.latest());
            CacheItem::pending(
                async move { request_data(&fetch_key, fetcher.as_ref(), &errors).await },
                Some(expires_at),
            )
            .with_stale(stale)
        });

        match &item {
            Some(_) => tracing::debug!(key, force = options.force, "fetch issued"),
            None => tracing::debug!(key, "entry still fresh, fetch deduplicated"),
        }
        item
    }

    /// Write `value` to `key`, then optionally revalidate it.
    ///
    /// Literal values are stored without expiration, so the following
    /// revalidation always fetches. Returns the stored item.
    pub fn mutate(
        &self,
        key: Option<&str>,
        value: MutateValue<D>,
        options: &MutateOptions<D>,
    ) -> Option<Arc<CacheItem<D>>> {
        let key = key?;

        let item = match value {
            MutateValue::Value(value) => Arc::new(CacheItem::new(value)),
            MutateValue::Item(item) => item,
            MutateValue::Update(f) => {
                let current = self.cache.get(key).and_then(|item| item.data());
                match f(current.as_ref()) {
                    Some(value) => Arc::new(CacheItem::new(value)),
                    None => Arc::new(CacheItem::empty()),
                }
            }
        };

        self.cache.set(key, Arc::clone(&item));
        tracing::debug!(key, revalidate = options.revalidate, "mutated");

        if options.revalidate {
            self.revalidate(Some(key), &options.revalidate_options);
        }
        Some(item)
    }

    /// Stale-while-revalidate read.
    ///
    /// Resolves `key_spec`, seeds `initial_data` into an absent key, revalidates
    /// if `revalidate_on_mount`, and returns what the cache holds right now:
    /// the settled value, or the stale value an in-flight fetch is replacing.
    /// Call-site `options` take precedence over the engine's global options.
    pub fn read(&self, key_spec: &KeySpec, options: &SwrOptions<D>) -> Option<D> {
        let Some(key) = resolve_key(key_spec) else {
            tracing::debug!("no key, nothing to read");
            return None;
        };
        let config = self.config.merge(options);

        if let Some(initial) = config.initial_data.clone()
            && !self.cache.has(&key)
        {
            self.mutate(
                Some(key.as_str()),
                MutateValue::Value(initial),
                &MutateOptions::without_revalidation(),
            );
        }

        if config.revalidate_on_mount {
            let revalidate_options = RevalidateOptions {
                force: false,
                fetcher: config.fetcher.clone(),
                deduping_interval: Some(config.deduping_interval),
            };
            self.revalidate(Some(key.as_str()), &revalidate_options);
        }

        self.cache.get(&key).and_then(|item| item.latest())
    }

    /// Paginated read: page `i`'s key is computed from page `i - 1`'s value.
    ///
    /// Stops at the first page whose key does not resolve.
    pub fn read_pages<F>(&self, page_key: F, pages: usize, options: &SwrOptions<D>) -> Vec<Option<D>>
    where
        F: Fn(usize, Option<&D>) -> Option<String>,
    {
        let mut values = Vec::with_capacity(pages);
        let mut previous: Option<D> = None;

        for index in 0..pages {
            let Some(key) = resolve_page_key(&page_key, index, previous.as_ref()) else {
                break;
            };
            let value = self.read(&KeySpec::Static(key), options);
            previous = value.clone();
            values.push(value);
        }
        values
    }

    /// Focus trigger from the host. Returns the number of fetches issued.
    ///
    /// Each key is revalidated at most once per `focus_throttle_interval`.
    pub fn on_focus(&self, keys: &[&str]) -> usize {
        let config = &self.config;
        if !config.revalidate_on_focus || !config.visible() || !config.online() {
            return 0;
        }

        let throttle = duration_ms(config.focus_throttle_interval);
        let now = now_ms();
        let due: Vec<&str> = {
            let mut last = lock(&self.focus_revalidated);
            last.retain(|_, at| now.saturating_sub(*at) < throttle);
            keys.iter()
                .copied()
                .filter(|key| {
                    let throttled = last
                        .get(*key)
                        .is_some_and(|at| now.saturating_sub(*at) < throttle);
                    if !throttled {
                        last.insert(key.to_string(), now);
                    }
                    !throttled
                })
                .collect()
        };

        self.revalidate_all(&due)
    }

    /// Reconnect trigger from the host. Returns the number of fetches issued.
    pub fn on_reconnect(&self, keys: &[&str]) -> usize {
        if !self.config.revalidate_on_reconnect || !self.config.online() {
            return 0;
        }
        self.revalidate_all(keys)
    }

    fn revalidate_all(&self, keys: &[&str]) -> usize {
        let options = RevalidateOptions::default();
        keys.iter()
            .filter(|key| self.revalidate(Some(**key), &options).is_some())
            .count()
    }
}
