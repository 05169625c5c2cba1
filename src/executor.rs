use tracing::{debug, error};

use crate::cache::CacheStore;
use crate::driver::Cursor;
use crate::error::PersistorError;
use crate::results::ResultSet;

/// Execute one rendered statement and materialize its rows.
///
/// Column names come from the cursor's description, so a statement that returns no rows
/// still yields a correctly labeled, empty result.
///
/// # Errors
/// Returns the driver's error unchanged if the statement fails, or
/// `PersistorError::ExecutionError` if the cursor offers no description afterwards.
pub fn execute_query<C: Cursor + ?Sized>(
    cursor: &mut C,
    rendered: &str,
) -> Result<ResultSet, PersistorError> {
    execute_rendered(cursor, rendered)?;
    let column_names = cursor
        .description()
        .ok_or_else(|| {
            PersistorError::ExecutionError(format!(
                "statement produced no description (query {})",
                CacheStore::digest(rendered)
            ))
        })?
        .to_vec();
    let rows = cursor.fetchall()?;
    ResultSet::from_rows(column_names, rows)
}

/// Execute one rendered statement for its side effects.
///
/// # Errors
/// Returns the driver's error unchanged if the statement fails.
pub fn execute_rendered<C: Cursor + ?Sized>(
    cursor: &mut C,
    rendered: &str,
) -> Result<(), PersistorError> {
    debug!(query = rendered, "execute");
    cursor.execute(rendered).inspect_err(|e| {
        error!(
            query = rendered,
            digest = %CacheStore::digest(rendered),
            error = %e,
            "statement failed"
        );
    })
}

/// Execute through `cache` when one is configured.
pub(crate) fn execute_cached<C: Cursor + ?Sized>(
    cursor: &mut C,
    rendered: &str,
    cache: Option<&CacheStore>,
) -> Result<ResultSet, PersistorError> {
    match cache {
        Some(store) => store.get_or_compute(rendered, || execute_query(cursor, rendered)),
        None => execute_query(cursor, rendered),
    }
}
