use std::borrow::Cow;

use crate::cache::CacheStore;
use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::driver::Cursor;
use crate::error::PersistorError;
use crate::executor::{execute_cached, execute_rendered};
use crate::render::render;
use crate::results::ResultSet;
use crate::types::{Keys, Parameters};

/// Fluent builder that renders a template and runs it, optionally chunked by one key set
/// and optionally through a result cache.
///
/// ```rust
/// use sql_persistor::prelude::*;
///
/// # fn demo(cur: &mut dyn Cursor, cache: &CacheStore) -> Result<(), PersistorError> {
/// let keys = Keys::from([("cohort".to_string(), KeySet::from_iter([0_i64, 1, 2]))]);
/// let result = QueryBuilder::new(
///     cur,
///     "with cohort as (select cast(null as int) as id {cohort}) select id from cohort",
/// )
/// .keys(&keys)
/// .by("cohort")
/// .size(1)
/// .cache(cache)
/// .select()?;
/// # let _ = result;
/// # Ok(())
/// # }
/// ```
pub struct QueryBuilder<'cur, 'q, C: Cursor + ?Sized> {
    cursor: &'cur mut C,
    sql: &'q str,
    keys: Cow<'q, Keys>,
    parameters: Cow<'q, Parameters>,
    by: Option<&'q str>,
    size: usize,
    cache: Option<&'q CacheStore>,
}

impl<'cur, 'q, C: Cursor + ?Sized> QueryBuilder<'cur, 'q, C> {
    pub fn new(cursor: &'cur mut C, sql: &'q str) -> Self {
        Self {
            cursor,
            sql,
            keys: Cow::Owned(Keys::new()),
            parameters: Cow::Owned(Parameters::new()),
            by: None,
            size: DEFAULT_CHUNK_SIZE,
            cache: None,
        }
    }

    /// Key sets for `{name}` placeholders.
    #[must_use]
    pub fn keys(mut self, keys: &'q Keys) -> Self {
        self.keys = Cow::Borrowed(keys);
        self
    }

    /// Values for `%(name)s` placeholders.
    #[must_use]
    pub fn parameters(mut self, parameters: &'q Parameters) -> Self {
        self.parameters = Cow::Borrowed(parameters);
        self
    }

    /// Chunk the named key set, running one statement per chunk.
    ///
    /// That is `ceil(N / size)` statements for `N` keys, except that an empty key set still
    /// runs once with an empty clause so the result keeps the query's columns.
    #[must_use]
    pub fn by(mut self, name: &'q str) -> Self {
        self.by = Some(name);
        self
    }

    /// Maximum keys per chunk when chunking with [`by`](Self::by).
    #[must_use]
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Serve and store results through `cache`.
    #[must_use]
    pub fn cache(mut self, cache: &'q CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Like [`cache`](Self::cache), but a no-op for `None`.
    #[must_use]
    pub fn maybe_cache(mut self, cache: Option<&'q CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    /// Every statement this builder would run, in execution order.
    ///
    /// # Errors
    /// Returns `PersistorError::TemplateError` if the `by` key set is missing or rendering
    /// fails, and `PersistorError::ConfigError` for a zero chunk size.
    pub fn render(&self) -> Result<Vec<String>, PersistorError> {
        let Some(by) = self.by else {
            return Ok(vec![render(
                &*self.cursor,
                self.sql,
                &self.keys,
                &self.parameters,
            )?]);
        };
        let key_set = self.keys.get(by).ok_or_else(|| {
            PersistorError::template(format!("no key set supplied for chunking by {{{by}}}"))
        })?;
        // Rows landing in different chunks are never compared by `union_all`.
        key_set.arity()?;
        let chunks = key_set.chunks(self.size)?;
        if chunks.is_empty() {
            // Still run once so the result carries the query's columns.
            return Ok(vec![render(
                &*self.cursor,
                self.sql,
                &self.keys,
                &self.parameters,
            )?]);
        }

        let mut keys = self.keys.as_ref().clone();
        let mut rendered = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            keys.insert(by.to_string(), chunk);
            rendered.push(render(&*self.cursor, self.sql, &keys, &self.parameters)?);
        }
        Ok(rendered)
    }

    /// Execute and return the combined tabular result, chunk results concatenated in order.
    ///
    /// An empty `by` key set runs one statement, not zero.
    ///
    /// # Errors
    /// Returns rendering errors, the driver's error for a failed statement, or
    /// `PersistorError::CacheError` if the cache cannot be used.
    pub fn select(self) -> Result<ResultSet, PersistorError> {
        let statements = self.render()?;
        let mut combined = ResultSet::default();
        for rendered in &statements {
            let result = execute_cached(self.cursor, rendered, self.cache)?;
            combined.concat(result)?;
        }
        Ok(combined)
    }

    /// Execute for side effects only; no rows are read and the cache is not consulted.
    ///
    /// # Errors
    /// Returns rendering errors or the driver's error for a failed statement.
    pub fn run(self) -> Result<(), PersistorError> {
        for rendered in &self.render()? {
            execute_rendered(self.cursor, rendered)?;
        }
        Ok(())
    }
}
