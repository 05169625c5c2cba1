//! `%s` / `%(name)s` parameter substitution.
//!
//! Placeholders are only recognized in plain SQL text. Anything inside quoted literals,
//! quoted identifiers, comments, or dollar-quoted blocks is copied through untouched, so
//! a literal produced by an earlier substitution pass can never be re-read as a
//! placeholder.

use crate::error::PersistorError;
use crate::types::{BindArgs, RowValues};

use super::scanner::State;

/// Replace every placeholder in `sql` with `quote(value)`.
///
/// `%%` outside quotes becomes a literal `%`.
///
/// # Errors
/// Returns `PersistorError::TemplateError` if a placeholder has no value, the placeholder
/// style does not match `args`, positional values are left over, or a `%` is followed by
/// an unsupported conversion. Errors from `quote` are returned unchanged.
pub fn substitute<F>(sql: &str, args: BindArgs<'_>, mut quote: F) -> Result<String, PersistorError>
where
    F: FnMut(&RowValues) -> Result<String, PersistorError>,
{
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut state = State::Normal;
    let mut copied = 0;
    let mut next_positional = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let (last, plain) = state.step(bytes, idx);
        if !(plain && bytes[idx] == b'%') {
            idx = last + 1;
            continue;
        }

        out.push_str(&sql[copied..idx]);
        let end = match bytes.get(idx + 1) {
            Some(b'%') => {
                out.push('%');
                idx + 2
            }
            Some(b's') => {
                let BindArgs::Positional(values) = args else {
                    return Err(PersistorError::template(format!(
                        "positional placeholder at offset {idx} but named parameters were supplied"
                    )));
                };
                let value = values.get(next_positional).ok_or_else(|| {
                    PersistorError::template(format!(
                        "not enough positional parameters: placeholder {} at offset {idx}",
                        next_positional + 1
                    ))
                })?;
                next_positional += 1;
                out.push_str(&quote(value)?);
                idx + 2
            }
            Some(b'(') => {
                let close = bytes[idx + 2..]
                    .iter()
                    .position(|b| *b == b')')
                    .map(|offset| idx + 2 + offset)
                    .ok_or_else(|| {
                        PersistorError::template(format!("unterminated %( at offset {idx}"))
                    })?;
                if bytes.get(close + 1) != Some(&b's') {
                    return Err(PersistorError::template(format!(
                        "named placeholder at offset {idx} must end in ')s'"
                    )));
                }
                let name = &sql[idx + 2..close];
                let BindArgs::Named(parameters) = args else {
                    return Err(PersistorError::template(format!(
                        "named placeholder %({name})s but positional parameters were supplied"
                    )));
                };
                let value = parameters.get(name).ok_or_else(|| {
                    PersistorError::template(format!("missing parameter %({name})s"))
                })?;
                out.push_str(&quote(value)?);
                close + 2
            }
            _ => {
                return Err(PersistorError::template(format!(
                    "unsupported format character after % at offset {idx}"
                )));
            }
        };
        idx = end;
        copied = end;
    }
    out.push_str(&sql[copied..]);

    if let BindArgs::Positional(values) = args
        && next_positional != values.len()
    {
        return Err(PersistorError::template(format!(
            "{} positional parameters supplied but only {next_positional} placeholders found",
            values.len()
        )));
    }
    Ok(out)
}
