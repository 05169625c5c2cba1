//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::asset::{Asset, AssetTree};
pub use crate::cache::CacheStore;
pub use crate::chunk::{DEFAULT_CHUNK_SIZE, chunks};
pub use crate::config::{PersistorOptions, PersistorOptionsBuilder};
pub use crate::driver::{Connection, Connector, Cursor};
pub use crate::error::{ErrorKind, FragmentFailure, PersistorError};
pub use crate::executor::{execute_query, execute_rendered};
pub use crate::persistor::Persistor;
pub use crate::query_builder::QueryBuilder;
pub use crate::render::{render, render_without_keys, union_all};
pub use crate::results::{ResultSet, Row};
pub use crate::retry::{RetryPolicy, retry};
pub use crate::types::{BindArgs, KeySet, Keys, Parameters, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnection, SqliteConnector, SqliteCursor, SqliteOptions};
