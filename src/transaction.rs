//! Commit and rollback scopes around one connection.
//!
//! Both scopes own the connection for their whole lifetime and release it on every exit
//! path, including a panic inside the caller's closure.

use tracing::{info, warn};

use crate::driver::{Connection, Cursor};
use crate::error::PersistorError;

/// Connection held for the duration of a scope.
struct Scope<C: Connection> {
    conn: Option<C>,
}

impl<C: Connection> Scope<C> {
    fn new(conn: C) -> Self {
        info!(key = "persistor.open");
        Self { conn: Some(conn) }
    }

    fn conn_mut(&mut self) -> Result<&mut C, PersistorError> {
        self.conn.as_mut().ok_or_else(|| {
            PersistorError::ExecutionError("transaction scope already completed".into())
        })
    }

    fn with_cursor<T, F>(&mut self, f: F) -> Result<T, PersistorError>
    where
        F: FnOnce(&mut dyn Cursor) -> Result<T, PersistorError>,
    {
        let conn = self.conn_mut()?;
        let mut cursor = conn.cursor()?;
        f(&mut *cursor)
    }

    fn commit(&mut self) -> Result<(), PersistorError> {
        self.conn_mut()?.commit()?;
        info!(key = "persistor.commit");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), PersistorError> {
        let result = self.conn_mut()?.rollback();
        info!(key = "persistor.rollback");
        result
    }

    fn close(mut self) -> Result<(), PersistorError> {
        match self.conn.take() {
            Some(conn) => {
                let result = conn.close();
                info!(key = "persistor.close");
                result
            }
            None => Ok(()),
        }
    }
}

impl<C: Connection> Drop for Scope<C> {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.rollback() {
                warn!(key = "persistor.rollback", error = %e, "rollback on drop failed");
            }
            if let Err(e) = conn.close() {
                warn!(key = "persistor.close", error = %e, "close on drop failed");
            }
        }
    }
}

/// Run `f` with a cursor on `conn`, committing if it succeeds.
///
/// If `f` (or the commit) fails, the transaction is rolled back and the original error is
/// returned unchanged.
///
/// # Errors
/// Returns the error from `f`, from opening the cursor, from committing, or from closing
/// the connection after a successful commit.
pub fn commit<C, T, F>(conn: C, f: F) -> Result<T, PersistorError>
where
    C: Connection,
    F: FnOnce(&mut dyn Cursor) -> Result<T, PersistorError>,
{
    let mut scope = Scope::new(conn);
    let outcome = scope.with_cursor(f).and_then(|value| {
        scope.commit()?;
        Ok(value)
    });
    match outcome {
        Ok(value) => {
            scope.close()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_error) = scope.rollback() {
                warn!(key = "persistor.rollback", error = %rollback_error, "rollback failed");
            }
            if let Err(close_error) = scope.close() {
                warn!(key = "persistor.close", error = %close_error, "close failed");
            }
            Err(e)
        }
    }
}

/// Run `f` with a cursor on `conn`, then roll back unconditionally.
///
/// Nothing done inside the scope is ever made durable.
///
/// # Errors
/// Returns the error from `f` first; otherwise any error from rolling back or closing.
pub fn rollback<C, T, F>(conn: C, f: F) -> Result<T, PersistorError>
where
    C: Connection,
    F: FnOnce(&mut dyn Cursor) -> Result<T, PersistorError>,
{
    let mut scope = Scope::new(conn);
    let outcome = scope.with_cursor(f);
    let rolled_back = scope.rollback();
    let closed = scope.close();
    let value = match outcome {
        Ok(value) => value,
        Err(e) => {
            if let Err(rollback_error) = rolled_back {
                warn!(key = "persistor.rollback", error = %rollback_error, "rollback failed");
            }
            if let Err(close_error) = closed {
                warn!(key = "persistor.close", error = %close_error, "close failed");
            }
            return Err(e);
        }
    };
    rolled_back?;
    closed?;
    Ok(value)
}
