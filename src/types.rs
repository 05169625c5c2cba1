use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::PersistorError;

/// Values that can be stored in a database row, bound as a query parameter, or inlined
/// as a key.
///
/// ```rust
/// use sql_persistor::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(#[serde(with = "float_repr")] f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%3f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// JSON has no spelling for NaN or the infinities, so those travel as strings.
mod float_repr {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Special(String),
    }

    pub(super) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            Repr::Finite(*value).serialize(serializer)
        } else if value.is_nan() {
            Repr::Special("NaN".into()).serialize(serializer)
        } else if value.is_sign_positive() {
            Repr::Special("inf".into()).serialize(serializer)
        } else {
            Repr::Special("-inf".into()).serialize(serializer)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Finite(value) => Ok(value),
            Repr::Special(s) => match s.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(serde::de::Error::custom(format!(
                    "unrecognized float spelling {other:?}"
                ))),
            },
        }
    }
}

/// Named parameters substituted for `%(name)s` placeholders.
pub type Parameters = BTreeMap<String, RowValues>;

/// Key sets substituted for `{name}` placeholders.
pub type Keys = BTreeMap<String, KeySet>;

/// Keys inlined into a query as a `union all select ...` clause.
///
/// `Scalars` yields one single-column row per value; `Rows` yields one multi-column row per
/// entry and every entry must have the same arity.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySet {
    Scalars(Vec<RowValues>),
    Rows(Vec<Vec<RowValues>>),
}

impl KeySet {
    /// Number of rows the clause will select.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            KeySet::Scalars(values) => values.len(),
            KeySet::Rows(rows) => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column count shared by every row; `None` for an empty tabular key set.
    ///
    /// # Errors
    /// Returns `PersistorError::TemplateError` if rows disagree on arity or have no columns.
    pub fn arity(&self) -> Result<Option<usize>, PersistorError> {
        match self {
            KeySet::Scalars(_) => Ok(Some(1)),
            KeySet::Rows(rows) => {
                let Some(first) = rows.first() else {
                    return Ok(None);
                };
                let arity = first.len();
                if arity == 0 {
                    return Err(PersistorError::template("tabular key set rows have no columns"));
                }
                if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != arity) {
                    return Err(PersistorError::template(format!(
                        "tabular key set row {idx} has {} columns, expected {arity}",
                        row.len()
                    )));
                }
                Ok(Some(arity))
            }
        }
    }

    /// Split into order-preserving chunks of at most `size` rows, keeping the variant.
    ///
    /// # Errors
    /// Returns `PersistorError::ConfigError` if `size` is zero.
    pub fn chunks(&self, size: usize) -> Result<Vec<KeySet>, PersistorError> {
        Ok(match self {
            KeySet::Scalars(values) => crate::chunk::chunks(values, size)?
                .map(|chunk| KeySet::Scalars(chunk.to_vec()))
                .collect(),
            KeySet::Rows(rows) => crate::chunk::chunks(rows, size)?
                .map(|chunk| KeySet::Rows(chunk.to_vec()))
                .collect(),
        })
    }
}

impl<T: Into<RowValues>> FromIterator<T> for KeySet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        KeySet::Scalars(iter.into_iter().map(Into::into).collect())
    }
}

/// Arguments handed to a driver's `mogrify`.
#[derive(Debug, Clone, Copy)]
pub enum BindArgs<'a> {
    /// Values for `%s` placeholders, consumed in order.
    Positional(&'a [RowValues]),
    /// Values for `%(name)s` placeholders.
    Named(&'a Parameters),
}
