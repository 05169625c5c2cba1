use std::path::PathBuf;

use serde::Deserialize;

use crate::cache::CacheStore;
use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::error::PersistorError;
use crate::retry::RetryPolicy;

/// Options shared by every persistor, independent of the driver.
///
/// ```rust
/// use sql_persistor::prelude::*;
///
/// let options: PersistorOptions =
///     serde_json::from_str(r#"{"cache_dir": "/tmp/cache", "retry": {"retries": 3}}"#).unwrap();
/// assert_eq!(options.chunk_size, 1000);
/// assert_eq!(options.retry.retries, 3);
/// assert_eq!(options.retry.backoff, 1.05);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PersistorOptions {
    /// Directory for cached query results; caching is off when `None`.
    pub cache_dir: Option<PathBuf>,
    /// Keys per statement when a query is chunked.
    pub chunk_size: usize,
    pub retry: RetryPolicy,
}

impl Default for PersistorOptions {
    fn default() -> Self {
        Self {
            cache_dir: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl PersistorOptions {
    #[must_use]
    pub fn builder() -> PersistorOptionsBuilder {
        PersistorOptionsBuilder::default()
    }

    /// Reject settings no persistor can run with.
    ///
    /// # Errors
    /// Returns `PersistorError::ConfigError` for a zero chunk size or a negative or
    /// non-finite retry delay or backoff.
    pub fn validate(&self) -> Result<(), PersistorError> {
        if self.chunk_size == 0 {
            return Err(PersistorError::ConfigError(
                "chunk_size must be at least 1".into(),
            ));
        }
        let RetryPolicy { delay, backoff, .. } = self.retry;
        if !delay.is_finite() || delay < 0.0 {
            return Err(PersistorError::ConfigError(format!(
                "retry delay must be a non-negative number of seconds, got {delay}"
            )));
        }
        if !backoff.is_finite() || backoff < 0.0 {
            return Err(PersistorError::ConfigError(format!(
                "retry backoff must be non-negative, got {backoff}"
            )));
        }
        Ok(())
    }

    /// Cache store for the configured directory, if any.
    #[must_use]
    pub fn cache_store(&self) -> Option<CacheStore> {
        self.cache_dir.as_ref().map(CacheStore::new)
    }
}

/// Fluent builder for [`PersistorOptions`].
#[derive(Debug, Clone, Default)]
pub struct PersistorOptionsBuilder {
    opts: PersistorOptions,
}

impl PersistorOptionsBuilder {
    #[must_use]
    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.opts.cache_dir = Some(cache_dir.into());
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.opts.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.opts.retry = retry;
        self
    }

    /// # Errors
    /// Returns `PersistorError::ConfigError` if the options fail [`PersistorOptions::validate`].
    pub fn finish(self) -> Result<PersistorOptions, PersistorError> {
        self.opts.validate()?;
        Ok(self.opts)
    }
}
