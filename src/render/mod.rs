//! Query rendering.
//!
//! A query template carries two substitution syntaxes:
//!
//! - `{name}` placeholders, replaced by `union all select ...` clauses built from key
//!   sets before anything else happens;
//! - `%(name)s` placeholders, bound by the driver's own quoting afterwards.
//!
//! Every literal value is quoted by the cursor (see [`Cursor::quote`]); this module only
//! decides where the quoted text goes.

use std::collections::BTreeMap;

use tracing::debug;

use crate::driver::Cursor;
use crate::error::PersistorError;
use crate::types::{BindArgs, KeySet, Keys, Parameters, RowValues};

pub mod pyformat;
mod scanner;
pub mod template;

const UNION_ALL_SEPARATOR: &str = "\n    ";

/// Render `query` with key-set clauses and named parameters into final SQL text.
///
/// ```rust
/// # use sql_persistor::prelude::*;
/// # fn demo(cur: &mut dyn Cursor) -> Result<(), PersistorError> {
/// let keys = Keys::from([("cohort".to_string(), KeySet::from_iter([1_i64, 2, 3]))]);
/// let sql = render(
///     &*cur,
///     "with cohort as (select cast(null as int) as id {cohort}) select id from cohort",
///     &keys,
///     &Parameters::new(),
/// )?;
/// # let _ = sql;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns `PersistorError::TemplateError` if a `{name}` placeholder has no key set, a
/// tabular key set is ragged, or a `%(name)s` parameter is missing. Quoting failures from
/// the cursor are returned unchanged.
pub fn render<C: Cursor + ?Sized>(
    cursor: &C,
    query: &str,
    keys: &Keys,
    parameters: &Parameters,
) -> Result<String, PersistorError> {
    let mut union_alls = BTreeMap::new();
    for (name, key_set) in keys {
        union_alls.insert(name.as_str(), union_all(cursor, key_set)?);
    }
    debug!(?union_alls, "union alls");
    debug!(query, "query");
    let formatted = template::format(query, |name| union_alls.get(name).map(String::as_str))?;
    cursor.mogrify(&formatted, BindArgs::Named(parameters))
}

/// Render `query` with named parameters only, treating `{..}` placeholders as absent.
///
/// # Errors
/// Returns `PersistorError::TemplateError` if the template is malformed or a parameter is
/// missing.
pub fn render_without_keys<C: Cursor + ?Sized>(
    cursor: &C,
    query: &str,
    parameters: &Parameters,
) -> Result<String, PersistorError> {
    let stripped = template::strip(query)?;
    cursor.mogrify(&stripped, BindArgs::Named(parameters))
}

/// Build the `union all select ...` clause for one key set.
///
/// An empty key set yields an empty clause, which selects no extra rows.
///
/// # Errors
/// Returns `PersistorError::TemplateError` if tabular rows disagree on arity.
pub fn union_all<C: Cursor + ?Sized>(
    cursor: &C,
    key_set: &KeySet,
) -> Result<String, PersistorError> {
    match key_set {
        KeySet::Scalars(values) => {
            let union = vec!["union all select %s"; values.len()].join(UNION_ALL_SEPARATOR);
            cursor.mogrify(&union, BindArgs::Positional(values))
        }
        KeySet::Rows(rows) => {
            let Some(arity) = key_set.arity()? else {
                return Ok(String::new());
            };
            let row = vec!["%s"; arity].join(", ");
            let union = vec![format!("union all select {row}"); rows.len()].join(UNION_ALL_SEPARATOR);
            let parameters: Vec<RowValues> = rows.iter().flatten().cloned().collect();
            cursor.mogrify(&union, BindArgs::Positional(&parameters))
        }
    }
}

/// Substitute `{name}` placeholders with raw text from `fields`.
///
/// Only for trusted fragments such as validated identifiers; values are not quoted.
///
/// # Errors
/// Returns `PersistorError::TemplateError` if the template is malformed or a field is
/// missing.
pub fn format_template(
    template: &str,
    fields: &BTreeMap<String, String>,
) -> Result<String, PersistorError> {
    template::format(template, |name| fields.get(name).map(String::as_str))
}
