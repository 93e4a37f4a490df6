//! Fetchers and the fetch requestor.
//!
//! A [`Fetcher`] turns a resolved key into a value. [`request_data`] wraps a
//! fetch so it always yields a settleable outcome: failures are published on
//! the error channel and become `None`.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use crate::channel::Channel;
use crate::error::FetchError;

/// Loads the value for a resolved key.
///
/// # Example
///
/// ```ignore
/// struct UserFetcher { db: Db }
///
/// #[async_trait]
/// impl Fetcher<User> for UserFetcher {
///     async fn fetch(&self, key: &str) -> Result<User, FetchError> {
///         self.db.user(key).await.map_err(|e| FetchError::failed(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait Fetcher<D>: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<D, FetchError>;
}

/// Adapter implementing [`Fetcher`] for an async closure.
pub struct FnFetcher<F> {
    f: F,
}

/// Wrap an async closure `Fn(String) -> Future<Output = Result<D, FetchError>>`
/// as a [`Fetcher`]. The closure receives the resolved key.
pub fn from_fn<D, F, Fut>(f: F) -> FnFetcher<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<D, FetchError>> + Send,
{
    FnFetcher { f }
}

#[async_trait]
impl<D, F, Fut> Fetcher<D> for FnFetcher<F>
where
    D: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<D, FetchError>> + Send,
{
    async fn fetch(&self, key: &str) -> Result<D, FetchError> {
        (self.f)(key.to_string()).await
    }
}

/// Invoke `fetcher` for `key`, converting failure into `None`.
///
/// A failed fetch is published on `errors` under `key` before this returns,
/// so every current error subscriber of the key receives it. A panicking
/// fetcher counts as a failed fetch.
pub async fn request_data<D>(
    key: &str,
    fetcher: &dyn Fetcher<D>,
    errors: &Channel<FetchError>,
) -> Option<D> {
    let outcome = AssertUnwindSafe(fetcher.fetch(key))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(FetchError::Panicked(panic_message(panic.as_ref()))));

    match outcome {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "fetch failed");
            errors.broadcast(key, &err);
            None
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(feature = "http")]
pub use http::HttpFetcher;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;
    use serde::de::DeserializeOwned;

    use super::Fetcher;
    use crate::error::FetchError;

    /// Default fetcher: HTTP GET the key as a URL and decode the JSON body.
    #[derive(Debug, Clone, Default)]
    pub struct HttpFetcher {
        client: reqwest::Client,
    }

    impl HttpFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Use a preconfigured client (timeouts, headers, proxies).
        pub fn with_client(client: reqwest::Client) -> Self {
            HttpFetcher { client }
        }
    }

    #[async_trait]
    impl<D> Fetcher<D> for HttpFetcher
    where
        D: DeserializeOwned + Send + 'static,
    {
        async fn fetch(&self, key: &str) -> Result<D, FetchError> {
            let response = self
                .client
                .get(key)
                .send()
                .await
                .map_err(|e| FetchError::http(key, e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: key.to_string(),
                    status: status.as_u16(),
                });
            }

            response
                .json::<D>()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))
        }
    }

}
