//! Row type for query results.

use std::sync::Arc;

use super::column::{find_by_name, ColumnDescription};
use super::value::Value;

/// One decoded result row: a fixed-length, ordered sequence of values.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    /// Description shared by every row of the result set.
    columns: Arc<[ColumnDescription]>,
}

impl Row {
    /// Create a new row.
    pub fn new(values: Vec<Value>, columns: Arc<[ColumnDescription]>) -> Self {
        Self { values, columns }
    }

    /// Get value by column index (0-based).
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get value by column name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        find_by_name(&self.columns, name).and_then(|idx| self.values.get(idx))
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get all values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get the column descriptions.
    pub fn columns(&self) -> &[ColumnDescription] {
        &self.columns
    }

    /// Iterate over the values.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Consume the row and return its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Rows compare by their values only.
impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl PartialEq<[Value]> for Row {
    fn eq(&self, other: &[Value]) -> bool {
        self.values == other
    }
}

impl<const N: usize> PartialEq<[Value; N]> for Row {
    fn eq(&self, other: &[Value; N]) -> bool {
        self.values == other
    }
}

impl std::ops::Index<usize> for Row {
    type Output = Value;

    /// Panics if `index` is out of range; use [`Row::get`] to check.
    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
