//! Per-key publish/subscribe.
//!
//! A [`Channel`] keeps an ordered list of callbacks per key. Publishing
//! delivers the payload synchronously to every callback registered at the
//! moment of the call; callbacks run outside the channel lock, so they may
//! subscribe, unsubscribe or touch the cache themselves.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::utils::{read, write};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Channel::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Typed per-key subscriber registry.
pub struct Channel<T> {
    subscribers: RwLock<HashMap<String, Vec<(Subscription, Callback<T>)>>>,
    next_id: AtomicU64,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Channel {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback` for `key`.
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let handle = Subscription(self.next_id.fetch_add(1, Ordering::Relaxed));
        write(&self.subscribers)
            .entry(key.to_string())
            .or_default()
            .push((handle, Arc::new(callback)));
        handle
    }

    /// Remove a subscription. Returns `false` if it was not registered under `key`.
    pub fn unsubscribe(&self, key: &str, handle: Subscription) -> bool {
        let mut subscribers = write(&self.subscribers);
        let Some(list) = subscribers.get_mut(key) else {
            return false;
        };

        let before = list.len();
        list.retain(|(h, _)| *h != handle);
        let removed = list.len() != before;

        if list.is_empty() {
            subscribers.remove(key);
        }
        removed
    }

    /// Deliver `payload` to every current subscriber of `key`.
    ///
    /// Returns the number of callbacks invoked. Zero subscribers is not an error.
    pub fn broadcast(&self, key: &str, payload: &T) -> usize {
        let callbacks: Vec<Callback<T>> = match read(&self.subscribers).get(key) {
            Some(list) => list.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return 0,
        };

        tracing::trace!(key, subscribers = callbacks.len(), "broadcast");
        for callback in &callbacks {
            callback(payload);
        }
        callbacks.len()
    }

    /// Number of live subscribers for `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        read(&self.subscribers).get(key).map_or(0, Vec::len)
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("keys", &read(&self.subscribers).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_broadcast_reaches_every_subscriber_of_key() {
        let channel: Channel<i32> = Channel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = seen.clone();
            channel.subscribe("k", move |v| seen.lock().unwrap().push((tag, *v)));
        }
        let other = seen.clone();
        channel.subscribe("other", move |v| other.lock().unwrap().push(("other", *v)));

        assert_eq!(channel.broadcast("k", &7), 2);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let channel: Channel<String> = Channel::new();
        assert_eq!(channel.broadcast("nobody", &"x".to_string()), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let channel: Channel<i32> = Channel::new();
        let handle = channel.subscribe("k", |_| {});
        assert_eq!(channel.subscriber_count("k"), 1);

        assert!(!channel.unsubscribe("other", handle));
        assert!(channel.unsubscribe("k", handle));
        assert!(!channel.unsubscribe("k", handle));
        assert_eq!(channel.subscriber_count("k"), 0);
        assert_eq!(channel.broadcast("k", &1), 0);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let channel = Arc::new(Channel::<i32>::new());
        let handle = Arc::new(Mutex::new(None));

        let (ch, h) = (channel.clone(), handle.clone());
        let sub = channel.subscribe("k", move |_| {
            if let Some(sub) = h.lock().unwrap().take() {
                ch.unsubscribe("k", sub);
            }
        });
        *handle.lock().unwrap() = Some(sub);

        assert_eq!(channel.broadcast("k", &1), 1);
        assert_eq!(channel.subscriber_count("k"), 0);
    }
}
