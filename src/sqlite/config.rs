use std::path::PathBuf;
use std::time::Duration;

use super::connection::SqliteConnector;
use crate::asset::AssetTree;
use crate::config::PersistorOptions;
use crate::error::PersistorError;
use crate::persistor::Persistor;
use crate::retry::RetryPolicy;

/// Default time a statement waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for opening `SQLite` connections.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    pub busy_timeout: Duration,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }
}

/// Fluent builder for a `SQLite`-backed [`Persistor`].
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
    persistor: PersistorOptions,
    sql: AssetTree,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
            persistor: PersistorOptions::default(),
            sql: AssetTree::new(),
        }
    }

    #[must_use]
    pub fn busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.opts.busy_timeout = busy_timeout;
        self
    }

    /// SQL fragments used by dry runs and table checks.
    #[must_use]
    pub fn sql(mut self, sql: AssetTree) -> Self {
        self.sql = sql;
        self
    }

    #[must_use]
    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.persistor.cache_dir = Some(cache_dir.into());
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.persistor.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.persistor.retry = retry;
        self
    }

    /// Replace every persistor option at once, e.g. after deserializing them.
    #[must_use]
    pub fn options(mut self, persistor: PersistorOptions) -> Self {
        self.persistor = persistor;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a `Persistor` for `SQLite`.
    ///
    /// No connection is opened until the persistor is first used.
    ///
    /// # Errors
    ///
    /// Returns `PersistorError::ConfigError` if the persistor options are invalid.
    pub fn build(self) -> Result<Persistor<SqliteConnector>, PersistorError> {
        Persistor::with_options(SqliteConnector::new(self.opts), self.sql, self.persistor)
    }
}

impl Persistor<SqliteConnector> {
    #[must_use]
    pub fn sqlite_builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }
}
