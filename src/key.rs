//! Key resolution.
//!
//! A key specification is either a literal key or a function computing one.
//! Functions may depend on data that is not loaded yet; when they fail, panic,
//! or return nothing, the key resolves to "no key" and every engine operation
//! on it is a no-op.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::KeyError;

type KeyFn = Arc<dyn Fn() -> Result<Option<String>, KeyError> + Send + Sync>;

/// A key specification.
#[derive(Clone)]
pub enum KeySpec {
    /// A literal resolved key.
    Static(String),
    /// A key computed on every resolution.
    Dynamic(KeyFn),
    /// No key.
    None,
}

impl KeySpec {
    /// A key computed by `f`. Returning `None` means "not ready".
    ///
    /// # Example
    /// ```ignore
    /// let user = swr.cache().get("/api/user").and_then(|item| item.data());
    /// let key_spec = KeySpec::from_fn(move || {
    ///     Some(format!("/api/projects?uid={}", user.as_ref()?["id"]))
    /// });
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        KeySpec::Dynamic(Arc::new(move || Ok(f())))
    }

    /// A key computed by a fallible `f`. Errors mean "not ready".
    pub fn try_from_fn<F, E>(f: F) -> Self
    where
        F: Fn() -> Result<String, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        KeySpec::Dynamic(Arc::new(move || {
            f().map(Some).map_err(|e| KeyError::Failed(e.to_string()))
        }))
    }
}

impl From<&str> for KeySpec {
    fn from(key: &str) -> Self {
        KeySpec::Static(key.to_string())
    }
}

impl From<String> for KeySpec {
    fn from(key: String) -> Self {
        KeySpec::Static(key)
    }
}

impl From<Option<String>> for KeySpec {
    fn from(key: Option<String>) -> Self {
        key.map_or(KeySpec::None, KeySpec::Static)
    }
}

impl fmt::Debug for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySpec::Static(key) => f.debug_tuple("Static").field(key).finish(),
            KeySpec::Dynamic(_) => f.write_str("Dynamic(..)"),
            KeySpec::None => f.write_str("None"),
        }
    }
}

/// Resolve a key specification.
///
/// Literal keys are returned unchanged. Functions are invoked with no
/// arguments; an error, a panic, `None` or an empty string all yield `None`.
pub fn resolve_key(key_spec: &KeySpec) -> Option<String> {
    match key_spec {
        KeySpec::Static(key) => Some(key.clone()),
        KeySpec::None => None,
        KeySpec::Dynamic(f) => settle_key(catch_unwind(AssertUnwindSafe(|| f()))),
    }
}

/// Resolve the key of page `index` given the previous page's value.
///
/// Same failure policy as [`resolve_key`].
pub fn resolve_page_key<D, F>(f: &F, index: usize, previous: Option<&D>) -> Option<String>
where
    F: Fn(usize, Option<&D>) -> Option<String> + ?Sized,
{
    settle_key(catch_unwind(AssertUnwindSafe(|| Ok(f(index, previous)))))
}

fn settle_key(
    outcome: std::thread::Result<Result<Option<String>, KeyError>>,
) -> Option<String> {
    let result = outcome.unwrap_or(Err(KeyError::Panicked));
    match result {
        Ok(Some(key)) if !key.is_empty() => Some(key),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(error = %err, "key resolved to nothing");
            None
        }
    }
}
