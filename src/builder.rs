//! Builder API for creating engine instances, and the process-wide default engine.

use std::sync::{Arc, LazyLock, RwLock};

use crate::cache::CacheStore;
use crate::fetcher::Fetcher;
use crate::options::{SwrConfig, SwrOptions, SwrSettings};
use crate::store::Store;
use crate::stores::memory::HashMapStore;
use crate::swr::Swr;
use crate::utils::{read, write};

/// Builder for creating [`Swr`] engines.
///
/// Options given here become the engine's global options, merged over the
/// built-in defaults. Each `build` creates a fresh cache store and error
/// channel, so two built engines share nothing.
///
/// # Example
///
/// ```ignore
/// use swr_engine::{SwrBuilder, MokaStore, MokaStoreConfig, SwrSettings, from_fn};
/// use std::sync::Arc;
///
/// let swr = SwrBuilder::new()
///     .store(Arc::new(MokaStore::new(MokaStoreConfig::default())))
///     .settings(SwrSettings::from_env())
///     .fetcher(from_fn(|key| async move { load_user(&key).await }))
///     .build();
/// ```
pub struct SwrBuilder<D> {
    store: Option<Arc<dyn Store<D>>>,
    options: SwrOptions<D>,
    absent: Option<Box<dyn Fn(&D) -> bool + Send + Sync>>,
}

impl<D> SwrBuilder<D>
where
    D: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        SwrBuilder {
            store: None,
            options: SwrOptions::default(),
            absent: None,
        }
    }

    /// Use `store` as the backend. Defaults to a `HashMapStore`.
    pub fn store(mut self, store: Arc<dyn Store<D>>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the global options.
    pub fn options(mut self, options: SwrOptions<D>) -> Self {
        self.options = options;
        self
    }

    /// Set the global fetcher.
    pub fn fetcher(mut self, fetcher: impl Fetcher<D> + 'static) -> Self {
        self.options.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Treat values for which `is_absent` returns true as "no value".
    /// Defaults to treating a JSON `null` as absent.
    pub fn absent_when<F>(mut self, is_absent: F) -> Self
    where
        F: Fn(&D) -> bool + Send + Sync + 'static,
    {
        self.absent = Some(Box::new(is_absent));
        self
    }

    /// Apply serializable settings, keeping the fetcher, initial data and
    /// triggers already configured.
    pub fn settings(mut self, settings: SwrSettings) -> Self {
        let from_settings: SwrOptions<D> = settings.into();
        self.options = SwrOptions {
            fetcher: self.options.fetcher,
            initial_data: self.options.initial_data,
            is_visible: self.options.is_visible,
            is_online: self.options.is_online,
            ..from_settings
        };
        self
    }

    /// Build the engine.
    pub fn build(self) -> Swr<D> {
        let store: Arc<dyn Store<D>> = match self.store {
            Some(store) => store,
            None => Arc::new(HashMapStore::new()),
        };
        let config = SwrConfig::default().merge(&self.options);
        tracing::debug!(
            store = store.name(),
            deduping_interval_ms = config.deduping_interval.as_millis() as u64,
            has_fetcher = config.fetcher.is_some(),
            "building swr engine"
        );
        let mut cache = CacheStore::with_store(store);
        if let Some(is_absent) = self.absent {
            cache = cache.with_absent(is_absent);
        }
        Swr::new(cache, config)
    }
}

#[cfg(feature = "http")]
impl<D> SwrBuilder<D>
where
    D: serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Use the default HTTP fetcher: the key is fetched as a URL and its
    /// body decoded as JSON.
    pub fn with_http_fetcher(self) -> Self {
        self.fetcher(crate::fetcher::HttpFetcher::new())
    }
}

impl<D> Default for SwrBuilder<D>
where
    D: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: LazyLock<RwLock<Swr<serde_json::Value>>> =
    LazyLock::new(|| RwLock::new(default_global()));

fn default_global() -> Swr<serde_json::Value> {
    let builder = SwrBuilder::new().settings(SwrSettings::from_env());
    #[cfg(feature = "http")]
    let builder = builder.with_http_fetcher();
    builder.build()
}

/// The process-wide default engine over JSON values.
///
/// It is configured from `SWR_*` environment variables on first use and,
/// with the `http` feature, fetches keys as URLs.
pub fn global() -> Swr<serde_json::Value> {
    read(&*GLOBAL).clone()
}

/// Replace the default engine with `swr`, or with a fresh default one.
///
/// Handles obtained earlier from [`global`] keep using the engine they
/// were cloned from.
pub fn reset_global(swr: Option<Swr<serde_json::Value>>) {
    *write(&*GLOBAL) = swr.unwrap_or_else(default_global);
}
