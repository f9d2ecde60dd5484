//! Retry-after-reconnect wrapper for remote backends.

use crate::backend::{Backend, ItemRef};
use crate::error::StorageResult;
use tracing::warn;

/// A backend whose connection can be re-established.
pub trait Reconnect {
    /// Drops and re-opens the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be re-opened.
    fn reconnect(&self) -> StorageResult<()>;
}

/// Retry policy for [`RetryingBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first failed attempt.
    pub retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { retries: 1 }
    }
}

impl RetryConfig {
    /// Creates the default policy: one retry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of retries.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Wraps a backend so transient failures trigger a reconnect and a retry.
///
/// Only I/O errors count as transient. Every other error is returned on the
/// first attempt.
#[derive(Debug)]
pub struct RetryingBackend<B> {
    inner: B,
    config: RetryConfig,
}

impl<B: Backend + Reconnect> RetryingBackend<B> {
    /// Wraps `inner` with the default policy.
    pub fn new(inner: B) -> Self {
        Self::with_config(inner, RetryConfig::default())
    }

    /// Wraps `inner` with a custom policy.
    pub fn with_config(inner: B, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn run<T>(
        &self,
        operation: &str,
        item: ItemRef<'_>,
        f: impl Fn(&B) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut attempt = 0;
        loop {
            match f(&self.inner) {
                Err(e) if e.is_transient() && attempt < self.config.retries => {
                    attempt += 1;
                    warn!(
                        item = %self.inner.id(item),
                        operation,
                        attempt,
                        error = %e,
                        "backend operation failed, reconnecting"
                    );
                    self.inner.reconnect()?;
                }
                result => return result,
            }
        }
    }
}

impl<B: Backend + Reconnect> Backend for RetryingBackend<B> {
    fn kind(&self) -> &str {
        self.inner.kind()
    }

    fn location(&self) -> &str {
        self.inner.location()
    }

    fn exists(&self, item: ItemRef<'_>) -> StorageResult<bool> {
        self.run("exists", item, |b| b.exists(item))
    }

    fn store_raw(&self, item: ItemRef<'_>, data: &[u8]) -> StorageResult<()> {
        self.run("store", item, |b| b.store_raw(item, data))
    }

    fn load_raw(&self, item: ItemRef<'_>) -> StorageResult<Vec<u8>> {
        self.run("load", item, |b| b.load_raw(item))
    }

    fn remove(&self, item: ItemRef<'_>) -> StorageResult<()> {
        self.run("remove", item, |b| b.remove(item))
    }
}
