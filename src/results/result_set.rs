use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::row::Row;
use crate::error::PersistorError;
use crate::types::RowValues;

/// Column-labeled rows materialized from a cursor.
///
/// Column names are always present, even when there are no rows, so an empty result
/// still describes its shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Arc<Vec<String>>,
    rows: Vec<Vec<RowValues>>,
}

impl ResultSet {
    /// Create an empty result set with the given columns.
    #[must_use]
    pub fn new(column_names: Vec<String>) -> Self {
        Self {
            column_names: Arc::new(column_names),
            rows: Vec::new(),
        }
    }

    /// Create a result set from columns and already-materialized rows.
    ///
    /// # Errors
    /// Returns `PersistorError::ExecutionError` if a row's width differs from the column count.
    pub fn from_rows(
        column_names: Vec<String>,
        rows: Vec<Vec<RowValues>>,
    ) -> Result<Self, PersistorError> {
        let mut result_set = Self::new(column_names);
        result_set.rows.reserve(rows.len());
        for row in rows {
            result_set.add_row_values(row)?;
        }
        Ok(result_set)
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> &Arc<Vec<String>> {
        &self.column_names
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    /// Add a row to the result set
    ///
    /// # Errors
    /// Returns `PersistorError::ExecutionError` if the row's width differs from the column count.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) -> Result<(), PersistorError> {
        if row_values.len() != self.column_names.len() {
            return Err(PersistorError::ExecutionError(format!(
                "row has {} values but the result has {} columns",
                row_values.len(),
                self.column_names.len()
            )));
        }
        self.rows.push(row_values);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = Row<'_>> {
        self.rows
            .iter()
            .map(|values| Row::new(&self.column_names, values))
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows
            .get(index)
            .map(|values| Row::new(&self.column_names, values))
    }

    /// All values of one column, in row order.
    #[must_use]
    pub fn column(&self, column_name: &str) -> Option<Vec<&RowValues>> {
        let idx = self.column_names.iter().position(|c| c == column_name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Append another result's rows, preserving order.
    ///
    /// Results with no columns adopt the other side's columns; otherwise the column lists
    /// must match exactly.
    ///
    /// # Errors
    /// Returns `PersistorError::ExecutionError` if the column lists disagree.
    pub fn concat(&mut self, other: ResultSet) -> Result<(), PersistorError> {
        if self.column_names.is_empty() && self.rows.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.column_names.is_empty() && other.rows.is_empty() {
            return Ok(());
        }
        if self.column_names != other.column_names {
            return Err(PersistorError::ExecutionError(format!(
                "cannot concatenate results with columns {:?} and {:?}",
                self.column_names, other.column_names
            )));
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[i64]) -> ResultSet {
        ResultSet::from_rows(
            vec!["id".into()],
            values.iter().map(|v| vec![RowValues::Int(*v)]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn concat_keeps_order_and_columns() {
        let mut combined = ids(&[0]);
        combined.concat(ids(&[])).unwrap();
        combined.concat(ids(&[1, 2])).unwrap();
        assert_eq!(combined.get_column_names().as_slice(), ["id"]);
        let values: Vec<i64> = combined
            .rows()
            .map(|row| *row.get("id").and_then(RowValues::as_int).unwrap())
            .collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn concat_rejects_mismatched_columns() {
        let mut a = ids(&[1]);
        let b = ResultSet::new(vec!["other".into()]);
        assert!(a.concat(b).is_err());
    }

    #[test]
    fn rows_must_match_column_count() {
        let mut rs = ResultSet::new(vec!["a".into(), "b".into()]);
        assert!(rs.add_row_values(vec![RowValues::Null]).is_err());
    }
}
