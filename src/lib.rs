//! Render parameterized SQL templates, run them through a cursor, and cache the results.

pub mod asset;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod driver;
pub mod dry_run;
pub mod error;
pub mod executor;
pub mod persistor;
pub mod prelude;
pub mod query_builder;
pub mod render;
pub mod results;
pub mod retry;
pub mod transaction;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::{ErrorKind, PersistorError};
pub use persistor::Persistor;
pub use results::{ResultSet, Row};
pub use types::{BindArgs, KeySet, Keys, Parameters, RowValues};
