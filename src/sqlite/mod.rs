// SQLite module - reference driver built on rusqlite
//
// - config: connection options and the persistor builder
// - connection: connector, connection and cursor implementations
// - params: value conversion between crate and SQLite types
// - query: row extraction

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{DEFAULT_BUSY_TIMEOUT, SqliteOptions, SqliteOptionsBuilder};
pub use connection::{SqliteConnection, SqliteConnector, SqliteCursor};
pub use params::row_value_to_sqlite_value;
