//! Typed output artifacts produced by variable resolution
//!
//! A [`DataObject`] is the finished representation of one export variable: a
//! numeric 2-D array or a string vector. Materializing it checks its shape
//! against the configured output dimensions and converts it into columnar
//! series for the storage backend. Decoding goes the other way for the
//! round-trip check.

use crate::app::models::{Array2, MissingValue};
use crate::config::CompressionAlgorithm;
use crate::{Error, Result};
use polars::prelude::*;
use std::fmt;

/// Numeric artifact, one row per record and one column per repeat slot
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArtifact {
    array: Array2,
}

impl NumericArtifact {
    pub fn new(array: Array2) -> Self {
        Self { array }
    }

    pub fn array(&self) -> &Array2 {
        &self.array
    }

    pub fn into_array(self) -> Array2 {
        self.array
    }
}

/// String artifact, one entry per record; empty strings are missing
#[derive(Debug, Clone, PartialEq)]
pub struct StringArtifact {
    values: Vec<String>,
}

impl StringArtifact {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Resolved export variable ready for the storage backend
#[derive(Debug, Clone, PartialEq)]
pub enum DataObject {
    Numeric(NumericArtifact),
    Strings(StringArtifact),
}

/// Named output dimension with its size for the current partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub size: usize,
}

impl Dimension {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Per-variable write parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializeOptions {
    /// Chunk size per dimension; empty means one chunk per dimension extent
    pub chunks: Vec<usize>,
    /// Value written in place of missing entries; `None` writes nulls
    pub fill_value: Option<f64>,
    /// Codec for this variable's columns; `None` uses the pipeline setting
    pub compression: Option<CompressionAlgorithm>,
    pub long_name: Option<String>,
    pub units: Option<String>,
}

/// Shape-checked variable in columnar form, as handed to a storage backend
#[derive(Debug, Clone)]
pub struct MaterializedVariable {
    pub name: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub chunks: Vec<usize>,
    pub fill_value: Option<f64>,
    pub compression: Option<CompressionAlgorithm>,
    pub long_name: Option<String>,
    pub units: Option<String>,
    pub is_string: bool,
    /// One series for 1-D variables, `<name>_1 .. <name>_n` for 2-D ones
    pub columns: Vec<Series>,
}

impl MaterializedVariable {
    pub fn row_count(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Decode the columns back into an artifact, restoring the missing sentinel
    ///
    /// Nulls and fill values become the sentinel; every observed value comes back
    /// bit-for-bit, since materializing refuses a fill value that was observed.
    pub fn to_data_object(&self, missing: &MissingValue) -> Result<DataObject> {
        let rows = self.row_count();

        if self.is_string {
            let series = self.columns.first().ok_or_else(|| {
                Error::shape_mismatch(self.name.as_str(), "string variable has no column")
            })?;
            let values = series.str().map_err(|e| {
                Error::storage(format!("Column '{}' is not a string column", self.name), e)
            })?;

            let strings = values
                .into_iter()
                .map(|value| value.unwrap_or_default().to_string())
                .collect();
            return Ok(DataObject::Strings(StringArtifact::new(strings)));
        }

        let cols = self.columns.len();
        let mut data = vec![missing.sentinel; rows * cols];

        for (col, series) in self.columns.iter().enumerate() {
            let values = series.f64().map_err(|e| {
                Error::storage(
                    format!("Column '{}' is not a float column", series.name()),
                    e,
                )
            })?;

            for (row, value) in values.into_iter().enumerate().take(rows) {
                data[row * cols + col] = match value {
                    Some(v) if self.fill_value == Some(v) => missing.sentinel,
                    Some(v) => v,
                    None => missing.sentinel,
                };
            }
        }

        Ok(DataObject::Numeric(NumericArtifact::new(Array2::new(
            rows, cols, data,
        )?)))
    }
}

impl DataObject {
    pub fn numeric(array: Array2) -> Self {
        DataObject::Numeric(NumericArtifact::new(array))
    }

    pub fn strings(values: Vec<String>) -> Self {
        DataObject::Strings(StringArtifact::new(values))
    }

    pub fn row_count(&self) -> usize {
        match self {
            DataObject::Numeric(artifact) => artifact.array.rows(),
            DataObject::Strings(artifact) => artifact.values.len(),
        }
    }

    pub fn column_count(&self) -> usize {
        match self {
            DataObject::Numeric(artifact) => artifact.array.cols(),
            DataObject::Strings(_) => 1,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DataObject::Strings(_))
    }

    /// Numeric payload, `None` for string artifacts
    pub fn as_array(&self) -> Option<&Array2> {
        match self {
            DataObject::Numeric(artifact) => Some(&artifact.array),
            DataObject::Strings(_) => None,
        }
    }

    /// String payload, `None` for numeric artifacts
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            DataObject::Numeric(_) => None,
            DataObject::Strings(artifact) => Some(&artifact.values),
        }
    }

    /// Check the artifact against its output dimensions and convert it to columns
    ///
    /// Numeric artifacts take one dimension (single column) or two (records,
    /// columns); string artifacts take exactly one. The first dimension must
    /// match the record count. A fill value equal to an observed value is
    /// rejected, as it could not be told apart from a missing entry.
    pub fn materialize(
        &self,
        name: &str,
        dimensions: &[Dimension],
        options: &MaterializeOptions,
        missing: &MissingValue,
    ) -> Result<MaterializedVariable> {
        self.check_dimensions(name, dimensions)?;
        let chunks = resolve_chunks(name, dimensions, &options.chunks)?;

        let columns = match self {
            DataObject::Numeric(artifact) => {
                if let Some(fill) = options.fill_value {
                    check_fill_value(name, &artifact.array, fill, missing)?;
                }
                numeric_columns(name, &artifact.array, options.fill_value, missing)
            }
            DataObject::Strings(artifact) => {
                let values: Vec<Option<&str>> = artifact
                    .values
                    .iter()
                    .map(|value| (!value.is_empty()).then_some(value.as_str()))
                    .collect();
                vec![Series::new(name.into(), values)]
            }
        };

        Ok(MaterializedVariable {
            name: name.to_string(),
            dimensions: dimensions.iter().map(|dim| dim.name.clone()).collect(),
            shape: dimensions.iter().map(|dim| dim.size).collect(),
            chunks,
            fill_value: options.fill_value,
            compression: options.compression,
            long_name: options.long_name.clone(),
            units: options.units.clone(),
            is_string: self.is_string(),
            columns,
        })
    }

    fn check_dimensions(&self, name: &str, dimensions: &[Dimension]) -> Result<()> {
        let rows = self.row_count();
        let cols = self.column_count();

        let matches = match (self, dimensions) {
            (_, [records]) => records.size == rows && cols == 1,
            (DataObject::Numeric(_), [records, columns]) => {
                records.size == rows && columns.size == cols
            }
            _ => false,
        };

        if matches {
            Ok(())
        } else {
            let configured: Vec<String> = dimensions
                .iter()
                .map(|dim| format!("{}={}", dim.name, dim.size))
                .collect();
            Err(Error::shape_mismatch(
                name,
                format!(
                    "data is {}x{} but the configured dimensions are [{}]",
                    rows,
                    cols,
                    configured.join(", ")
                ),
            ))
        }
    }
}

fn resolve_chunks(name: &str, dimensions: &[Dimension], chunks: &[usize]) -> Result<Vec<usize>> {
    if chunks.is_empty() {
        return Ok(dimensions.iter().map(|dim| dim.size.max(1)).collect());
    }

    if chunks.len() != dimensions.len() || chunks.contains(&0) {
        return Err(Error::shape_mismatch(
            name,
            format!(
                "{} chunk sizes given for {} dimensions (all must be positive)",
                chunks.len(),
                dimensions.len()
            ),
        ));
    }

    Ok(chunks.to_vec())
}

fn check_fill_value(name: &str, array: &Array2, fill: f64, missing: &MissingValue) -> Result<()> {
    let collisions = array
        .values()
        .iter()
        .filter(|v| missing.is_present(**v) && **v == fill)
        .count();

    if collisions > 0 {
        return Err(Error::invalid_config(
            format!("{}::fillValue", name),
            format!(
                "a value never observed in the data ({} observations equal {})",
                collisions, fill
            ),
        ));
    }

    Ok(())
}

fn numeric_columns(
    name: &str,
    array: &Array2,
    fill_value: Option<f64>,
    missing: &MissingValue,
) -> Vec<Series> {
    let encode = |value: f64| {
        if missing.is_missing(value) {
            fill_value
        } else {
            Some(value)
        }
    };

    if array.cols() == 1 {
        let values: Vec<Option<f64>> = array.values().iter().map(|v| encode(*v)).collect();
        return vec![Series::new(name.into(), values)];
    }

    (0..array.cols())
        .map(|col| {
            let values: Vec<Option<f64>> =
                array.column(col).into_iter().map(encode).collect();
            Series::new(format!("{}_{}", name, col + 1).into(), values)
        })
        .collect()
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataObject::Numeric(artifact) => write!(f, "{}", artifact.array),
            DataObject::Strings(artifact) => {
                for value in &artifact.values {
                    writeln!(f, "{}", value)?;
                }
                Ok(())
            }
        }
    }
}
