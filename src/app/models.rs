//! Data models for decoded observation batches
//!
//! This module contains the core structures shared by every pipeline stage: the
//! missing-value policy, the owned 2-D numeric array, and the [`RawFieldMap`] the
//! decoder hands to the export stage.

use crate::constants::{MISSING_EPSILON, MISSING_VALUE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Missing Value Policy
// =============================================================================

/// Sentinel/epsilon pair deciding whether a decoded value is an observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissingValue {
    /// Reserved value written by the decoder for "no observation"
    pub sentinel: f64,
    /// Tolerance applied below the sentinel
    pub epsilon: f64,
}

impl Default for MissingValue {
    fn default() -> Self {
        Self {
            sentinel: MISSING_VALUE,
            epsilon: MISSING_EPSILON,
        }
    }
}

impl MissingValue {
    /// Create a policy with a custom sentinel and tolerance
    pub fn new(sentinel: f64, epsilon: f64) -> Self {
        Self { sentinel, epsilon }
    }

    /// A value is missing iff `value >= sentinel - epsilon`. NaN counts as missing.
    #[inline]
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn is_missing(&self, value: f64) -> bool {
        !(value < self.sentinel - self.epsilon)
    }

    /// Inverse of [`is_missing`](Self::is_missing)
    #[inline]
    pub fn is_present(&self, value: f64) -> bool {
        !self.is_missing(value)
    }

    /// True when at least one value is an observation
    pub fn any_present(&self, values: &[f64]) -> bool {
        values.iter().any(|v| self.is_present(*v))
    }
}

// =============================================================================
// Numeric Array
// =============================================================================

/// Owned row-major 2-D array of decoded values
///
/// Rows are observation records, columns are repeated-group or channel slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Array2 {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Array2 {
    /// Create an array from row-major data, validating the element count
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::shape_mismatch(
                "array",
                format!(
                    "{} values cannot fill a {}x{} array",
                    data.len(),
                    rows,
                    cols
                ),
            ));
        }

        Ok(Self { rows, cols, data })
    }

    /// Create an array with every element set to `value`
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Create a single-column array
    pub fn from_column(values: Vec<f64>) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values,
        }
    }

    /// Create an array from equally sized rows
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = rows.first().map_or(1, Vec::len);
        let row_count = rows.len();
        let mut data = Vec::with_capacity(row_count * cols);

        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(Error::shape_mismatch(
                    "array",
                    format!("row {} has {} columns, expected {}", index, row.len(), cols),
                ));
            }
            data.extend(row);
        }

        Ok(Self {
            rows: row_count,
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element at (row, col), `None` when out of bounds
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Slice holding one record
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Copy of one column
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|row| self.data[row * self.cols + col]).collect()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_values(self) -> Vec<f64> {
        self.data
    }

    /// New array holding only the listed rows, in the listed order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &row in indices {
            data.extend_from_slice(self.row(row));
        }

        Self {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }
}

impl fmt::Display for Array2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            let line: Vec<String> = self.row(row).iter().map(|v| v.to_string()).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

// =============================================================================
// Raw Field Map
// =============================================================================

/// Values of one decoded field across a record batch
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    /// Numeric field, one row per record
    Numeric(Array2),
    /// String field, one entry per record; empty strings mark missing records
    Strings(Vec<String>),
}

impl FieldValues {
    pub fn row_count(&self) -> usize {
        match self {
            FieldValues::Numeric(array) => array.rows(),
            FieldValues::Strings(values) => values.len(),
        }
    }

    pub fn column_count(&self) -> usize {
        match self {
            FieldValues::Numeric(array) => array.cols(),
            FieldValues::Strings(_) => 1,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, FieldValues::Strings(_))
    }

    /// Numeric payload, `None` for string fields
    pub fn as_numeric(&self) -> Option<&Array2> {
        match self {
            FieldValues::Numeric(array) => Some(array),
            FieldValues::Strings(_) => None,
        }
    }

    pub fn select_rows(&self, indices: &[usize]) -> Self {
        match self {
            FieldValues::Numeric(array) => FieldValues::Numeric(array.select_rows(indices)),
            FieldValues::Strings(values) => {
                FieldValues::Strings(indices.iter().map(|&i| values[i].clone()).collect())
            }
        }
    }
}

/// Field identifier → decoded values for one record batch
///
/// Produced once per batch by the decoder (or by
/// [`ResultSet::to_raw_field_map`](crate::app::services::result_set::ResultSet::to_raw_field_map))
/// and read-only to every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFieldMap {
    fields: BTreeMap<String, FieldValues>,
}

impl RawFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, returning the previous values under that name
    pub fn insert(&mut self, name: impl Into<String>, values: FieldValues) -> Option<FieldValues> {
        self.fields.insert(name.into(), values)
    }

    /// Convenience for inserting a single-column numeric field
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.insert(name, FieldValues::Numeric(Array2::from_column(values)));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValues> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValues)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Record count shared by the fields (0 for an empty map)
    pub fn row_count(&self) -> usize {
        self.fields.values().next().map_or(0, FieldValues::row_count)
    }

    /// Check that every field carries the same number of records
    pub fn validate_rows(&self) -> Result<usize> {
        let expected = self.row_count();
        for (name, values) in &self.fields {
            if values.row_count() != expected {
                return Err(Error::shape_mismatch(
                    name.as_str(),
                    format!(
                        "field has {} rows but the batch has {}",
                        values.row_count(),
                        expected
                    ),
                ));
            }
        }
        Ok(expected)
    }

    /// New map restricted to the listed rows
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .map(|(name, values)| (name.clone(), values.select_rows(indices)))
                .collect(),
        }
    }
}

impl FromIterator<(String, FieldValues)> for RawFieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldValues)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_value_boundary() {
        let missing = MissingValue::default();
        assert!(missing.is_missing(1.0e11));
        assert!(!missing.is_missing(1.0e11 - 1.0));
        assert!(missing.is_missing(f64::NAN));
        assert!(missing.is_missing(2.0e11));
        assert!(missing.is_present(-999.0));
    }

    #[test]
    fn test_custom_missing_value() {
        let missing = MissingValue::new(1.0e10, 1.0e-9);
        assert!(missing.is_missing(1.0e10));
        assert!(missing.is_present(9.0e9));
        assert!(missing.any_present(&[1.0e10, 5.0]));
        assert!(!missing.any_present(&[1.0e10, 1.0e10]));
    }

    #[test]
    fn test_array_shape_validation() {
        assert!(Array2::new(2, 2, vec![1.0, 2.0, 3.0]).is_err());

        let array = Array2::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(array.get(1, 2), Some(6.0));
        assert_eq!(array.get(2, 0), None);
        assert_eq!(array.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(array.column(1), vec![2.0, 5.0]);
    }

    #[test]
    fn test_array_from_rows_rejects_ragged_input() {
        assert!(Array2::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).is_err());

        let array = Array2::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(array.rows(), 2);
        assert_eq!(array.cols(), 2);
    }

    #[test]
    fn test_select_rows_keeps_order() {
        let array = Array2::from_rows(vec![vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let selected = array.select_rows(&[2, 0]);
        assert_eq!(selected.values(), &[3.0, 1.0]);
    }

    #[test]
    fn test_raw_field_map_row_validation() {
        let mut map = RawFieldMap::new();
        map.insert_column("CLAT", vec![1.0, 2.0]);
        map.insert(
            "SAID",
            FieldValues::Strings(vec!["a".to_string(), "b".to_string()]),
        );
        assert_eq!(map.validate_rows().unwrap(), 2);

        map.insert_column("CLON", vec![1.0]);
        assert!(matches!(
            map.validate_rows(),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_raw_field_map_select_rows() {
        let mut map = RawFieldMap::new();
        map.insert_column("CLAT", vec![10.0, 20.0, 30.0]);
        map.insert(
            "SAID",
            FieldValues::Strings(vec!["a".into(), "b".into(), "c".into()]),
        );

        let subset = map.select_rows(&[1]);
        assert_eq!(subset.row_count(), 1);
        assert_eq!(
            subset.get("SAID"),
            Some(&FieldValues::Strings(vec!["b".to_string()]))
        );
    }
}
