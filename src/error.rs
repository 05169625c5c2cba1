use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistorError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Cache error for {}: {message}", .path.display())]
    CacheError { path: PathBuf, message: String },

    #[error("Asset error for {}: {source}", .path.display())]
    AssetError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dry run failed for {}", FragmentNames(.0))]
    DryRunError(Vec<FragmentFailure>),

    #[error("Tables not found: {}", .0.join(", "))]
    MissingTables(Vec<String>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`PersistorError`], used wherever callers name a set of
/// "expected" failures (dry runs, table checks, retry predicates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unresolved placeholder, bad arity, malformed template.
    Template,
    /// Bad options such as a zero chunk size.
    Config,
    /// Could not establish a connection; the only retryable kind.
    Connection,
    /// The driver rejected or failed a statement.
    Execution,
    /// A cache file could not be read, decoded, or written.
    Cache,
    /// Loading SQL fragments from disk failed.
    Asset,
    /// Aggregate failures from dry runs or table checks.
    Validation,
    /// Any other I/O failure.
    Io,
}

impl PersistorError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            #[cfg(feature = "sqlite")]
            PersistorError::SqliteError(_) => ErrorKind::Execution,
            PersistorError::TemplateError(_) => ErrorKind::Template,
            PersistorError::ConfigError(_) => ErrorKind::Config,
            PersistorError::ConnectionError(_) => ErrorKind::Connection,
            PersistorError::ParameterError(_) | PersistorError::ExecutionError(_) => {
                ErrorKind::Execution
            }
            PersistorError::CacheError { .. } => ErrorKind::Cache,
            PersistorError::AssetError { .. } => ErrorKind::Asset,
            PersistorError::DryRunError(_) | PersistorError::MissingTables(_) => {
                ErrorKind::Validation
            }
            PersistorError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether a failed connection attempt is worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }

    pub(crate) fn template(message: impl Into<String>) -> Self {
        PersistorError::TemplateError(message.into())
    }
}

/// One fragment that failed during a dry run.
#[derive(Debug)]
pub struct FragmentFailure {
    /// Dotted name of the fragment within the asset tree.
    pub name: String,
    pub error: PersistorError,
}

impl fmt::Display for FragmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.error)
    }
}

struct FragmentNames<'a>(&'a [FragmentFailure]);

impl fmt::Display for FragmentNames<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&failure.name)?;
        }
        Ok(())
    }
}
