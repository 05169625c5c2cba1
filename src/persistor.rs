use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, error, info};

use crate::asset::AssetTree;
use crate::cache::CacheStore;
use crate::config::PersistorOptions;
use crate::driver::{Connector, Cursor};
use crate::dry_run::{self, DRY_RUN_PARAMETER};
use crate::error::{ErrorKind, PersistorError};
use crate::executor::execute_rendered;
use crate::query_builder::QueryBuilder;
use crate::render::{format_template, render_without_keys};
use crate::retry::{RetryPolicy, retry};
use crate::transaction;
use crate::types::{Parameters, RowValues};

/// Name of the fragment [`Persistor::extant`] formats.
pub const EXTANT_FRAGMENT: &str = "extant";

static SQL_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][A-Za-z0-9_.]*$").expect("valid identifier pattern"));

/// Injected wait used between connection attempts.
pub type SleepFn = Arc<dyn Fn(Duration) + Send + Sync>;

/// Connector, SQL fragments, retry policy and cache composed into one service.
///
/// ```rust,no_run
/// use sql_persistor::prelude::*;
///
/// # fn demo() -> Result<(), PersistorError> {
/// let persistor = SqliteOptions::builder("app.db")
///     .sql(AssetTree::from_dir("sql", "sql")?)
///     .cache_dir("cache")
///     .build()?;
///
/// let keys = Keys::from([("cohort".to_string(), KeySet::from_iter([1_i64, 2, 3]))]);
/// let ids = persistor.rollback(|cur| {
///     persistor
///         .query(cur, "with cohort as (select null as id {cohort}) select id from cohort")
///         .keys(&keys)
///         .by("cohort")
///         .select()
/// })?;
/// # let _ = ids;
/// # Ok(())
/// # }
/// ```
pub struct Persistor<K: Connector> {
    connector: K,
    sql: AssetTree,
    retry: RetryPolicy,
    sleep: SleepFn,
    cache: Option<CacheStore>,
    chunk_size: usize,
}

impl<K: Connector + fmt::Debug> fmt::Debug for Persistor<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistor")
            .field("connector", &self.connector)
            .field("sql", &self.sql)
            .field("retry", &self.retry)
            .field("cache", &self.cache)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl<K: Connector> Persistor<K> {
    /// Persistor with default options: no cache, chunks of 1000, 60 retries.
    pub fn new(connector: K, sql: AssetTree) -> Self {
        let options = PersistorOptions::default();
        Self {
            connector,
            sql,
            retry: options.retry,
            sleep: Arc::new(std::thread::sleep),
            cache: None,
            chunk_size: options.chunk_size,
        }
    }

    /// # Errors
    /// Returns `PersistorError::ConfigError` if `options` fail validation.
    pub fn with_options(
        connector: K,
        sql: AssetTree,
        options: PersistorOptions,
    ) -> Result<Self, PersistorError> {
        options.validate()?;
        let cache = options.cache_store();
        Ok(Self {
            retry: options.retry,
            cache,
            chunk_size: options.chunk_size,
            ..Self::new(connector, sql)
        })
    }

    /// Replace the wait between connection attempts, e.g. with a recorder in tests.
    #[must_use]
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Arc::new(sleep);
        self
    }

    #[must_use]
    pub fn sql(&self) -> &AssetTree {
        &self.sql
    }

    #[must_use]
    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    #[must_use]
    pub fn connector(&self) -> &K {
        &self.connector
    }

    /// Open a connection, retrying connection errors with backoff.
    ///
    /// # Errors
    /// Returns the first connection error once retries are exhausted, or any
    /// non-connection error at once.
    pub fn connect(&self) -> Result<K::Connection, PersistorError> {
        retry(
            &self.retry,
            PersistorError::is_transient,
            |wait| (self.sleep)(wait),
            || self.connector.connect(),
        )
    }

    /// Run `f` in a transaction that commits on success and rolls back on error.
    ///
    /// # Errors
    /// Returns connection errors, or the error from `f` unchanged after rolling back.
    pub fn commit<T, F>(&self, f: F) -> Result<T, PersistorError>
    where
        F: FnOnce(&mut dyn Cursor) -> Result<T, PersistorError>,
    {
        transaction::commit(self.connect()?, f)
    }

    /// Run `f` in a transaction that is always rolled back.
    ///
    /// # Errors
    /// Returns connection errors, the error from `f`, or a rollback failure.
    pub fn rollback<T, F>(&self, f: F) -> Result<T, PersistorError>
    where
        F: FnOnce(&mut dyn Cursor) -> Result<T, PersistorError>,
    {
        transaction::rollback(self.connect()?, f)
    }

    /// Query builder on `cursor` preloaded with this persistor's cache and chunk size.
    pub fn query<'cur, 'q, C: Cursor + ?Sized>(
        &'q self,
        cursor: &'cur mut C,
        sql: &'q str,
    ) -> QueryBuilder<'cur, 'q, C> {
        QueryBuilder::new(cursor, sql)
            .size(self.chunk_size)
            .maybe_cache(self.cache.as_ref())
    }

    /// Execute every fragment of the SQL tree under rollback with `dry_run` set to `1`.
    ///
    /// # Errors
    /// Returns `PersistorError::DryRunError` naming every fragment that failed with one of
    /// the `expected` kinds, or the first unexpected error.
    pub fn dry_run(
        &self,
        parameters: &Parameters,
        expected: &[ErrorKind],
    ) -> Result<(), PersistorError> {
        dry_run::dry_run(&self.sql, parameters, expected, |query, parameters| {
            self.dry_run_query(query, parameters)
        })
    }

    /// Render `query` without keys, with `dry_run` set to `1`, and execute it under rollback.
    ///
    /// # Errors
    /// Returns rendering, connection or statement errors.
    pub fn dry_run_query(&self, query: &str, parameters: &Parameters) -> Result<(), PersistorError> {
        let mut parameters = parameters.clone();
        parameters.insert(DRY_RUN_PARAMETER.to_string(), RowValues::Int(1));
        self.rollback(|cur| {
            let rendered = render_without_keys(&*cur, query, &parameters)?;
            execute_rendered(cur, &rendered)
        })
    }

    /// SQL that fails unless `table` exists, from the tree's `extant` fragment.
    ///
    /// # Errors
    /// Returns `PersistorError::TemplateError` if `table` is not a plain (optionally
    /// schema-qualified) identifier or the tree has no `extant` fragment.
    pub fn extant(&self, table: &str) -> Result<String, PersistorError> {
        if !SQL_IDENTIFIER.is_match(table) {
            return Err(PersistorError::template(format!(
                "Not a sql identifier: {table}."
            )));
        }
        let fragment = self.sql.get(EXTANT_FRAGMENT).ok_or_else(|| {
            PersistorError::template(format!("no {EXTANT_FRAGMENT} fragment in sql assets"))
        })?;
        let fields = BTreeMap::from([("table".to_string(), table.to_string())]);
        let rendered = format_template(fragment, &fields)?;
        debug!(key = "persistor.sql.extant", value = %rendered);
        Ok(rendered)
    }

    /// Run each table's `extant` query under rollback and report the missing ones together.
    ///
    /// # Errors
    /// Returns `PersistorError::MissingTables` listing every table whose check failed with
    /// one of the `expected` kinds, or the first unexpected error.
    pub fn check(&self, tables: &[&str], expected: &[ErrorKind]) -> Result<(), PersistorError> {
        let mut missing = Vec::new();
        for table in tables {
            let sql = self.extant(table)?;
            match self.rollback(|cur| execute_rendered(cur, &sql)) {
                Ok(()) => {}
                Err(e) if expected.contains(&e.kind()) => {
                    error!(key = "persistor.table.error", table, error = %e);
                    missing.push((*table).to_string());
                }
                Err(e) => return Err(e),
            }
        }
        if !missing.is_empty() {
            error!(key = "persistor.tables.error", tables = ?missing);
            return Err(PersistorError::MissingTables(missing));
        }
        info!(key = "persistor.tables.ok", count = tables.len());
        Ok(())
    }
}
