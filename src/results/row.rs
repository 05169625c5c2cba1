use crate::types::RowValues;

/// A borrowed row from a [`ResultSet`](super::ResultSet).
///
/// Values are addressed by column name or position; column names are shared with the
/// owning result set rather than copied per row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    column_names: &'a [String],
    values: &'a [RowValues],
}

impl<'a> Row<'a> {
    pub(crate) fn new(column_names: &'a [String], values: &'a [RowValues]) -> Self {
        Self {
            column_names,
            values,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    ///
    /// Returns `None` if the column wasn't found.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&'a RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&'a RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn values(&self) -> &'a [RowValues] {
        self.values
    }
}
