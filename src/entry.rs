use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use tokio::sync::watch;

use crate::utils::lock;

/// Payload of a cache item.
enum ItemState<D> {
    /// A fetch is in flight. The future is taken by the store that resolves it.
    Pending(Option<BoxFuture<'static, Option<D>>>),
    /// The value is known.
    Settled(D),
    /// The pending computation produced nothing.
    Empty,
}

/// A cache entry: a value or a pending value, plus its expiration.
///
/// Items are shared by `Arc` and keep their identity for their whole life.
/// A pending item is filled in place exactly once when its computation settles,
/// so callers holding a reference observe the settled value through it.
pub struct CacheItem<D> {
    state: Mutex<ItemState<D>>,

    /// Unix timestamp in milliseconds.
    /// Before this time the entry is fresh enough to suppress a refetch.
    /// `None` means the entry is always treated as expired.
    expires_at: Option<i64>,

    /// Value the entry held before this pending fetch replaced it.
    stale: Option<D>,

    resolved: watch::Sender<bool>,
}

impl<D> CacheItem<D> {
    /// Create a settled item with no expiration (always stale).
    pub fn new(value: D) -> Self {
        Self::with_expiration(value, None)
    }

    /// Create a settled item with a custom expiration.
    pub fn with_expiration(value: D, expires_at: Option<i64>) -> Self {
        Self::from_state(ItemState::Settled(value), expires_at)
    }

    /// Create a pending item whose value is produced by `future`.
    ///
    /// The future is not polled until the item is stored in a cache. A future
    /// resolving to `None` removes the key once it settles.
    pub fn pending<F>(future: F, expires_at: Option<i64>) -> Self
    where
        F: Future<Output = Option<D>> + Send + 'static,
    {
        Self::from_state(ItemState::Pending(Some(future.boxed())), expires_at)
    }

    /// Create an item that holds nothing. Storing it removes the key.
    pub fn empty() -> Self {
        Self::from_state(ItemState::Empty, None)
    }

    fn from_state(state: ItemState<D>, expires_at: Option<i64>) -> Self {
        let resolving = matches!(state, ItemState::Pending(_));
        let (resolved, _) = watch::channel(!resolving);
        CacheItem {
            state: Mutex::new(state),
            expires_at,
            stale: None,
            resolved,
        }
    }

    /// Keep `previous` visible through [`latest`](Self::latest) while pending.
    pub fn with_stale(mut self, previous: Option<D>) -> Self {
        self.stale = previous;
        self
    }

    /// Expiration timestamp in unix milliseconds, if any.
    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    /// Check if the payload is still pending.
    pub fn is_resolving(&self) -> bool {
        matches!(*lock(&self.state), ItemState::Pending(_))
    }

    /// Check if the item settled to nothing.
    pub fn is_empty(&self) -> bool {
        matches!(*lock(&self.state), ItemState::Empty)
    }

    /// Check if the entry has expired.
    ///
    /// An item without expiration is always expired.
    pub fn has_expired(&self, now_ms: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at < now_ms,
            None => true,
        }
    }

    /// Inspect the settled value without cloning it.
    ///
    /// Pending and empty items are seen as `None`.
    pub fn with_data<R>(&self, f: impl FnOnce(Option<&D>) -> R) -> R {
        let state = lock(&self.state);
        match &*state {
            ItemState::Settled(value) => f(Some(value)),
            _ => f(None),
        }
    }

    /// Take the pending computation out of the item.
    ///
    /// Returns `None` if the item is not pending or its future was already taken.
    pub(crate) fn take_pending(&self) -> Option<BoxFuture<'static, Option<D>>> {
        match &mut *lock(&self.state) {
            ItemState::Pending(future) => future.take(),
            _ => None,
        }
    }

    /// Replace the payload with the settled outcome.
    ///
    /// Waiters are not woken until [`finish`](Self::finish) is called, so the
    /// cache store can broadcast in between.
    pub(crate) fn fill(&self, value: Option<D>) {
        let mut state = lock(&self.state);
        *state = match value {
            Some(value) => ItemState::Settled(value),
            None => ItemState::Empty,
        };
    }

    /// Wake everything waiting in [`settled`](Self::settled).
    pub(crate) fn finish(&self) {
        self.resolved.send_replace(true);
    }
}

impl<D: Clone> CacheItem<D> {
    /// The settled value, or `None` while pending or when empty.
    pub fn data(&self) -> Option<D> {
        self.with_data(|value| value.cloned())
    }

    /// The settled value or, while pending, the stale value it replaces.
    pub fn latest(&self) -> Option<D> {
        let state = lock(&self.state);
        match &*state {
            ItemState::Settled(value) => Some(value.clone()),
            ItemState::Pending(_) => self.stale.clone(),
            ItemState::Empty => None,
        }
    }

    /// Wait until the item is no longer pending and return its value.
    pub async fn settled(&self) -> Option<D> {
        let mut rx = self.resolved.subscribe();
        // The sender lives in `self`, so the wait cannot observe a closed channel.
        let _ = rx.wait_for(|resolved| *resolved).await;
        self.data()
    }
}

impl<D: fmt::Debug> fmt::Debug for CacheItem<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        let mut debug = f.debug_struct("CacheItem");
        match &*state {
            ItemState::Pending(_) => debug.field("data", &"<pending>"),
            ItemState::Settled(value) => debug.field("data", value),
            ItemState::Empty => debug.field("data", &"<empty>"),
        };
        debug.field("expires_at", &self.expires_at).finish()
    }
}
