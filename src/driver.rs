//! Seams to the underlying database driver.
//!
//! The persistence layer never speaks a wire protocol itself. It drives a cursor-like
//! object that executes fully rendered SQL, and it relies on the driver to turn values
//! into safe SQL literals.

use crate::error::PersistorError;
use crate::render::pyformat;
use crate::types::{BindArgs, RowValues};

/// A cursor over one open connection.
pub trait Cursor {
    /// Execute one rendered statement.
    ///
    /// # Errors
    /// Returns the driver's error if the statement fails.
    fn execute(&mut self, sql: &str) -> Result<(), PersistorError>;

    /// Column names of the last executed statement, or `None` if nothing has run yet.
    fn description(&self) -> Option<&[String]>;

    /// Drain every row produced by the last executed statement.
    ///
    /// # Errors
    /// Returns the driver's error if rows cannot be read.
    fn fetchall(&mut self) -> Result<Vec<Vec<RowValues>>, PersistorError>;

    /// Render `value` as a SQL literal using the driver's own escaping.
    ///
    /// # Errors
    /// Returns the driver's error if the value cannot be quoted.
    fn quote(&self, value: &RowValues) -> Result<String, PersistorError>;

    /// Substitute `%s` / `%(name)s` placeholders with quoted literals.
    ///
    /// # Errors
    /// Returns `PersistorError::TemplateError` for missing or surplus arguments, or the
    /// driver's error if quoting fails.
    fn mogrify(&self, sql: &str, args: BindArgs<'_>) -> Result<String, PersistorError> {
        pyformat::substitute(sql, args, |value| self.quote(value))
    }
}

/// An open connection that hands out cursors and ends transactions.
pub trait Connection {
    /// Open a cursor borrowing this connection.
    ///
    /// # Errors
    /// Returns the driver's error if a cursor cannot be opened.
    fn cursor(&mut self) -> Result<Box<dyn Cursor + '_>, PersistorError>;

    /// # Errors
    /// Returns the driver's error if the commit fails.
    fn commit(&mut self) -> Result<(), PersistorError>;

    /// # Errors
    /// Returns the driver's error if the rollback fails.
    fn rollback(&mut self) -> Result<(), PersistorError>;

    /// Release the connection.
    ///
    /// # Errors
    /// Returns the driver's error if closing fails; the connection is gone either way.
    fn close(self) -> Result<(), PersistorError>
    where
        Self: Sized;
}

/// Establishes connections; the only step the persistor retries.
pub trait Connector {
    type Connection: Connection;

    /// # Errors
    /// Returns `PersistorError::ConnectionError` for failures worth retrying.
    fn connect(&self) -> Result<Self::Connection, PersistorError>;
}
