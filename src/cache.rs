//! Content-addressed, on-disk cache of rendered-query results.
//!
//! Each file is named by the SHA-256 digest of the rendered SQL and holds a table of
//! `{rendered SQL -> ResultSet}`. Lookups only hit on an exact match of the rendered text,
//! so a digest collision degrades to a miss rather than a wrong answer, and several
//! renderings can share one file over the data's lifetime.
//!
//! Nothing is ever evicted. The key is the SQL text, not a version of the underlying
//! data, so stale entries must be cleared by removing the directory.
//!
//! Writes go to a temporary file in the cache directory that is then renamed over the
//! target, so readers never observe a torn file. Concurrent writers of the same digest
//! still race: the last rename wins and entries added by the other writer are lost.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::PersistorError;
use crate::results::ResultSet;

/// Suffix shared by every cache file.
pub const CACHE_EXTENSION: &str = ".json.gz.sql.cache";

/// Every rendering stored under one digest.
pub type CacheTable = BTreeMap<String, ResultSet>;

/// Handle on a cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    directory: PathBuf,
}

impl CacheStore {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Lowercase hex SHA-256 of the rendered query.
    #[must_use]
    pub fn digest(rendered: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(rendered.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// File that holds (or would hold) the entry for `rendered`.
    #[must_use]
    pub fn path_for(&self, rendered: &str) -> PathBuf {
        self.directory
            .join(format!("{}{CACHE_EXTENSION}", Self::digest(rendered)))
    }

    /// Return the cached result for `rendered`, or compute, store, and return it.
    ///
    /// `compute` runs only on a miss. A corrupt cache file is reported, not repaired.
    ///
    /// # Errors
    /// Returns `PersistorError::CacheError` if the cache file cannot be read, decoded, or
    /// written, and any error from `compute` unchanged.
    pub fn get_or_compute<F>(&self, rendered: &str, compute: F) -> Result<ResultSet, PersistorError>
    where
        F: FnOnce() -> Result<ResultSet, PersistorError>,
    {
        let path = self.path_for(rendered);
        let mut table = load_table(&path)?.unwrap_or_default();
        if let Some(result) = table.get(rendered) {
            debug!(key = "cache.hit", path = %path.display());
            return Ok(result.clone());
        }
        debug!(key = "cache.miss", path = %path.display(), entries = table.len());

        let result = compute()?;
        table.insert(rendered.to_string(), result.clone());
        self.store_table(&path, &table)?;
        Ok(result)
    }

    /// Look up `rendered` without computing anything.
    ///
    /// # Errors
    /// Returns `PersistorError::CacheError` if an existing cache file cannot be decoded.
    pub fn get(&self, rendered: &str) -> Result<Option<ResultSet>, PersistorError> {
        let path = self.path_for(rendered);
        Ok(load_table(&path)?.and_then(|mut table| table.remove(rendered)))
    }

    fn store_table(&self, path: &Path, table: &CacheTable) -> Result<(), PersistorError> {
        let cache_error = |message: String| PersistorError::CacheError {
            path: path.to_path_buf(),
            message,
        };
        fs::create_dir_all(&self.directory)
            .map_err(|e| cache_error(format!("cannot create cache directory: {e}")))?;

        let encoded =
            serde_json::to_vec(table).map_err(|e| cache_error(format!("cannot encode: {e}")))?;
        let temp = NamedTempFile::new_in(&self.directory)
            .map_err(|e| cache_error(format!("cannot create temporary file: {e}")))?;
        let mut encoder = GzEncoder::new(temp, Compression::default());
        encoder
            .write_all(&encoded)
            .map_err(|e| cache_error(format!("cannot write: {e}")))?;
        let temp = encoder
            .finish()
            .map_err(|e| cache_error(format!("cannot write: {e}")))?;
        temp.persist(path)
            .map_err(|e| cache_error(format!("cannot replace cache file: {}", e.error)))?;
        Ok(())
    }
}

/// `Ok(None)` when the file does not exist.
fn load_table(path: &Path) -> Result<Option<CacheTable>, PersistorError> {
    let cache_error = |message: String| PersistorError::CacheError {
        path: path.to_path_buf(),
        message,
    };
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(cache_error(format!("cannot open: {e}"))),
    };
    let mut decoded = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut decoded)
        .map_err(|e| cache_error(format!("cannot decompress: {e}")))?;
    let table =
        serde_json::from_slice(&decoded).map_err(|e| cache_error(format!("cannot decode: {e}")))?;
    Ok(Some(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;
    use std::cell::Cell;
    use tempfile::tempdir;

    fn one(value: i64) -> ResultSet {
        ResultSet::from_rows(vec!["n".into()], vec![vec![RowValues::Int(value)]]).unwrap()
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let calls = Cell::new(0);
        let compute = || -> Result<ResultSet, PersistorError> {
            calls.set(calls.get() + 1);
            Ok(one(1))
        };
        let a = store.get_or_compute("select 1 as n", compute).unwrap();
        let b = store.get_or_compute("select 1 as n", compute).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(a, b);
        assert!(store.path_for("select 1 as n").exists());
    }

    #[test]
    fn same_digest_file_holds_several_renderings() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let path = store.path_for("select 1 as n");
        // Simulate a digest collision by planting a foreign rendering in the file.
        let mut table = CacheTable::new();
        table.insert("select 2 as n".into(), one(2));
        store.store_table(&path, &table).unwrap();

        let result = store
            .get_or_compute("select 1 as n", || Ok(one(1)))
            .unwrap();
        assert_eq!(result, one(1));
        let stored = load_table(&path).unwrap().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored["select 2 as n"], one(2));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        fs::write(store.path_for("select 1"), b"not gzip").unwrap();
        let err = store
            .get_or_compute("select 1", || Ok(one(1)))
            .unwrap_err();
        assert!(matches!(err, PersistorError::CacheError { .. }));
    }

    #[test]
    fn compute_errors_leave_no_file() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested"));
        let err = store
            .get_or_compute("select broken", || {
                Err(PersistorError::ExecutionError("boom".into()))
            })
            .unwrap_err();
        assert!(matches!(err, PersistorError::ExecutionError(_)));
        assert!(!store.path_for("select broken").exists());
    }
}
