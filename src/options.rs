//! Engine options.
//!
//! Options are merged with precedence call-site > global > built-in defaults.
//! [`SwrConfig`] is a fully resolved set; [`SwrOptions`] is a partial set laid
//! over it with [`SwrConfig::merge`].

use serde::Deserialize;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::fetcher::Fetcher;

/// Default window during which revalidations of a fresh key are deduplicated.
pub const DEFAULT_DEDUPING_INTERVAL: Duration = Duration::from_millis(2000);

/// Default minimum time between two focus revalidations of the same key.
pub const DEFAULT_FOCUS_THROTTLE_INTERVAL: Duration = Duration::from_millis(5000);

/// A host-supplied condition such as "is visible" or "is online".
pub type Trigger = Arc<dyn Fn() -> bool + Send + Sync>;

/// Fully resolved engine options.
#[derive(Clone)]
pub struct SwrConfig<D> {
    /// Fetcher used when a call site does not provide one.
    pub fetcher: Option<Arc<dyn Fetcher<D>>>,
    /// Value seeded into an absent key on read.
    pub initial_data: Option<D>,
    /// Revalidate when a key is read.
    pub revalidate_on_mount: bool,
    pub deduping_interval: Duration,
    pub revalidate_on_focus: bool,
    pub focus_throttle_interval: Duration,
    pub revalidate_on_reconnect: bool,
    /// Focus revalidation is skipped while this reports `false`.
    pub is_visible: Option<Trigger>,
    /// Focus and reconnect revalidation are skipped while this reports `false`.
    pub is_online: Option<Trigger>,
}

impl<D> Default for SwrConfig<D> {
    fn default() -> Self {
        SwrConfig {
            fetcher: None,
            initial_data: None,
            revalidate_on_mount: true,
            deduping_interval: DEFAULT_DEDUPING_INTERVAL,
            revalidate_on_focus: true,
            focus_throttle_interval: DEFAULT_FOCUS_THROTTLE_INTERVAL,
            revalidate_on_reconnect: true,
            is_visible: None,
            is_online: None,
        }
    }
}

impl<D: Clone> SwrConfig<D> {
    /// Lay `options` over this config. Fields set in `options` win.
    pub fn merge(&self, options: &SwrOptions<D>) -> SwrConfig<D> {
        SwrConfig {
            fetcher: options.fetcher.clone().or_else(|| self.fetcher.clone()),
            initial_data: options
                .initial_data
                .clone()
                .or_else(|| self.initial_data.clone()),
            revalidate_on_mount: options
                .revalidate_on_mount
                .unwrap_or(self.revalidate_on_mount),
            deduping_interval: options
                .deduping_interval
                .unwrap_or(self.deduping_interval),
            revalidate_on_focus: options
                .revalidate_on_focus
                .unwrap_or(self.revalidate_on_focus),
            focus_throttle_interval: options
                .focus_throttle_interval
                .unwrap_or(self.focus_throttle_interval),
            revalidate_on_reconnect: options
                .revalidate_on_reconnect
                .unwrap_or(self.revalidate_on_reconnect),
            is_visible: options.is_visible.clone().or_else(|| self.is_visible.clone()),
            is_online: options.is_online.clone().or_else(|| self.is_online.clone()),
        }
    }

    /// Whether the host reports itself visible. Missing trigger means visible.
    pub fn visible(&self) -> bool {
        self.is_visible.as_ref().is_none_or(|f| f())
    }

    /// Whether the host reports itself online. Missing trigger means online.
    pub fn online(&self) -> bool {
        self.is_online.as_ref().is_none_or(|f| f())
    }
}

/// Partial engine options, used for global and call-site overrides.
#[derive(Clone)]
pub struct SwrOptions<D> {
    pub fetcher: Option<Arc<dyn Fetcher<D>>>,
    pub initial_data: Option<D>,
    pub revalidate_on_mount: Option<bool>,
    pub deduping_interval: Option<Duration>,
    pub revalidate_on_focus: Option<bool>,
    pub focus_throttle_interval: Option<Duration>,
    pub revalidate_on_reconnect: Option<bool>,
    pub is_visible: Option<Trigger>,
    pub is_online: Option<Trigger>,
}

impl<D> Default for SwrOptions<D> {
    fn default() -> Self {
        SwrOptions {
            fetcher: None,
            initial_data: None,
            revalidate_on_mount: None,
            deduping_interval: None,
            revalidate_on_focus: None,
            focus_throttle_interval: None,
            revalidate_on_reconnect: None,
            is_visible: None,
            is_online: None,
        }
    }
}

impl<D> SwrOptions<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetcher(mut self, fetcher: impl Fetcher<D> + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn shared_fetcher(mut self, fetcher: Arc<dyn Fetcher<D>>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn initial_data(mut self, value: D) -> Self {
        self.initial_data = Some(value);
        self
    }

    pub fn revalidate_on_mount(mut self, enabled: bool) -> Self {
        self.revalidate_on_mount = Some(enabled);
        self
    }

    pub fn deduping_interval(mut self, interval: Duration) -> Self {
        self.deduping_interval = Some(interval);
        self
    }

    pub fn revalidate_on_focus(mut self, enabled: bool) -> Self {
        self.revalidate_on_focus = Some(enabled);
        self
    }

    pub fn focus_throttle_interval(mut self, interval: Duration) -> Self {
        self.focus_throttle_interval = Some(interval);
        self
    }

    pub fn revalidate_on_reconnect(mut self, enabled: bool) -> Self {
        self.revalidate_on_reconnect = Some(enabled);
        self
    }

    pub fn is_visible(mut self, trigger: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.is_visible = Some(Arc::new(trigger));
        self
    }

    pub fn is_online(mut self, trigger: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.is_online = Some(Arc::new(trigger));
        self
    }
}

/// Serializable subset of the options, loadable from a config file or the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SwrSettings {
    pub deduping_interval_ms: u64,
    pub focus_throttle_interval_ms: u64,
    pub revalidate_on_mount: bool,
    pub revalidate_on_focus: bool,
    pub revalidate_on_reconnect: bool,
}

impl Default for SwrSettings {
    fn default() -> Self {
        SwrSettings {
            deduping_interval_ms: DEFAULT_DEDUPING_INTERVAL.as_millis() as u64,
            focus_throttle_interval_ms: DEFAULT_FOCUS_THROTTLE_INTERVAL.as_millis() as u64,
            revalidate_on_mount: true,
            revalidate_on_focus: true,
            revalidate_on_reconnect: true,
        }
    }
}

impl SwrSettings {
    /// Load settings from `SWR_*` environment variables.
    ///
    /// Missing or unparsable variables keep their default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            deduping_interval_ms: env_parse("SWR_DEDUPING_INTERVAL_MS")
                .unwrap_or(defaults.deduping_interval_ms),
            focus_throttle_interval_ms: env_parse("SWR_FOCUS_THROTTLE_INTERVAL_MS")
                .unwrap_or(defaults.focus_throttle_interval_ms),
            revalidate_on_mount: env_bool("SWR_REVALIDATE_ON_MOUNT")
                .unwrap_or(defaults.revalidate_on_mount),
            revalidate_on_focus: env_bool("SWR_REVALIDATE_ON_FOCUS")
                .unwrap_or(defaults.revalidate_on_focus),
            revalidate_on_reconnect: env_bool("SWR_REVALIDATE_ON_RECONNECT")
                .unwrap_or(defaults.revalidate_on_reconnect),
        }
    }
}

fn env_parse(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    match env::var(name).ok()?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl<D> From<SwrSettings> for SwrOptions<D> {
    fn from(settings: SwrSettings) -> Self {
        SwrOptions {
            revalidate_on_mount: Some(settings.revalidate_on_mount),
            deduping_interval: Some(Duration::from_millis(settings.deduping_interval_ms)),
            revalidate_on_focus: Some(settings.revalidate_on_focus),
            focus_throttle_interval: Some(Duration::from_millis(
                settings.focus_throttle_interval_ms,
            )),
            revalidate_on_reconnect: Some(settings.revalidate_on_reconnect),
            ..SwrOptions::default()
        }
    }
}

/// Options for a single revalidation.
#[derive(Clone)]
pub struct RevalidateOptions<D> {
    /// Fetch even if the cached entry is still fresh.
    pub force: bool,
    /// Overrides the engine's fetcher.
    pub fetcher: Option<Arc<dyn Fetcher<D>>>,
    /// Overrides the engine's dedup window.
    pub deduping_interval: Option<Duration>,
}

impl<D> Default for RevalidateOptions<D> {
    fn default() -> Self {
        RevalidateOptions {
            force: false,
            fetcher: None,
            deduping_interval: None,
        }
    }
}

impl<D> RevalidateOptions<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn fetcher(mut self, fetcher: impl Fetcher<D> + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn shared_fetcher(mut self, fetcher: Arc<dyn Fetcher<D>>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn deduping_interval(mut self, interval: Duration) -> Self {
        self.deduping_interval = Some(interval);
        self
    }
}

/// Options for a mutation.
#[derive(Clone)]
pub struct MutateOptions<D> {
    /// Revalidate the key after writing. Defaults to `true`.
    pub revalidate: bool,
    /// Options for that revalidation.
    pub revalidate_options: RevalidateOptions<D>,
}

impl<D> Default for MutateOptions<D> {
    fn default() -> Self {
        MutateOptions {
            revalidate: true,
            revalidate_options: RevalidateOptions::default(),
        }
    }
}

impl<D> MutateOptions<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write only, without revalidating afterwards.
    pub fn without_revalidation() -> Self {
        MutateOptions {
            revalidate: false,
            ..Self::default()
        }
    }

    pub fn revalidate(mut self, revalidate: bool) -> Self {
        self.revalidate = revalidate;
        self
    }

    pub fn revalidate_options(mut self, options: RevalidateOptions<D>) -> Self {
        self.revalidate_options = options;
        self
    }
}
