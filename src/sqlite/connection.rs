use std::fmt;

use tracing::debug;

use super::config::SqliteOptions;
use super::params::row_value_to_sqlite_value;
use super::query::{collect_rows, column_names};
use crate::driver::{Connection, Connector, Cursor};
use crate::error::PersistorError;
use crate::types::RowValues;

/// Opens `SQLite` connections from [`SqliteOptions`].
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    opts: SqliteOptions,
}

impl SqliteConnector {
    #[must_use]
    pub fn new(opts: SqliteOptions) -> Self {
        Self { opts }
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.opts
    }
}

impl Connector for SqliteConnector {
    type Connection = SqliteConnection;

    fn connect(&self) -> Result<SqliteConnection, PersistorError> {
        let db_path = &self.opts.db_path;
        let conn = rusqlite::Connection::open(db_path).map_err(|e| {
            PersistorError::ConnectionError(format!("Failed to open SQLite database {db_path}: {e}"))
        })?;
        conn.busy_timeout(self.opts.busy_timeout).map_err(|e| {
            PersistorError::ConnectionError(format!("Failed to set SQLite busy timeout: {e}"))
        })?;
        debug!(db_path = %db_path, "sqlite connection opened");
        Ok(SqliteConnection { conn })
    }
}

/// One `SQLite` connection; cursors open a deferred transaction on first use.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("in_transaction", &!self.conn.is_autocommit())
            .finish()
    }
}

impl SqliteConnection {
    /// Borrow the underlying rusqlite connection.
    #[must_use]
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    fn cursor(&mut self) -> Result<Box<dyn Cursor + '_>, PersistorError> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN DEFERRED")?;
        }
        Ok(Box::new(SqliteCursor::new(&self.conn)))
    }

    fn commit(&mut self) -> Result<(), PersistorError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), PersistorError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn close(self) -> Result<(), PersistorError> {
        self.conn
            .close()
            .map_err(|(_conn, e)| PersistorError::SqliteError(e))
    }
}

/// Cursor that buffers the rows of the last executed statement.
pub struct SqliteCursor<'c> {
    conn: &'c rusqlite::Connection,
    columns: Option<Vec<String>>,
    rows: Vec<Vec<RowValues>>,
}

impl<'c> SqliteCursor<'c> {
    #[must_use]
    pub fn new(conn: &'c rusqlite::Connection) -> Self {
        Self {
            conn,
            columns: None,
            rows: Vec::new(),
        }
    }
}

impl Cursor for SqliteCursor<'_> {
    fn execute(&mut self, sql: &str) -> Result<(), PersistorError> {
        self.columns = None;
        self.rows.clear();
        let mut stmt = self.conn.prepare(sql)?;
        let columns = column_names(&stmt);
        self.rows = collect_rows(&mut stmt)?;
        self.columns = Some(columns);
        Ok(())
    }

    fn description(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    fn fetchall(&mut self) -> Result<Vec<Vec<RowValues>>, PersistorError> {
        Ok(std::mem::take(&mut self.rows))
    }

    fn quote(&self, value: &RowValues) -> Result<String, PersistorError> {
        let literal = self.conn.query_row(
            "select quote(?1)",
            [row_value_to_sqlite_value(value)],
            |row| row.get::<_, String>(0),
        )?;
        Ok(literal)
    }
}
