/// Error raised by a fetcher and published on the error channel.
///
/// Fetch errors never escape `revalidate` or `mutate`; they are delivered to
/// the key's error subscribers while the failed key is removed from the cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The fetcher failed with a free-form message.
    #[error("{0}")]
    Failed(String),
    /// The HTTP request could not be performed.
    #[error("http request for '{url}' failed: {message}")]
    Http { url: String, message: String },
    /// The server answered with a non-success status.
    #[error("unexpected status {status} from '{url}'")]
    Status { url: String, status: u16 },
    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// A revalidation was requested but no fetcher is configured.
    #[error("no fetcher configured")]
    MissingFetcher,
    /// The fetcher panicked.
    #[error("fetcher panicked: {0}")]
    Panicked(String),
}

impl FetchError {
    /// Create a free-form fetch failure.
    pub fn failed(message: impl Into<String>) -> Self {
        FetchError::Failed(message.into())
    }

    /// Create an HTTP transport error.
    pub fn http(url: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Http {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl From<String> for FetchError {
    fn from(message: String) -> Self {
        FetchError::Failed(message)
    }
}

impl From<&str> for FetchError {
    fn from(message: &str) -> Self {
        FetchError::Failed(message.to_string())
    }
}

/// Reason a key specification did not produce a key.
///
/// Only ever logged. Callers observe "no key".
#[derive(Debug, Clone, thiserror::Error)]
pub enum KeyError {
    /// The key function returned an error.
    #[error("key function failed: {0}")]
    Failed(String),
    /// The key function panicked.
    #[error("key function panicked")]
    Panicked,
}
