//! Storage backends receiving materialized variables

use super::data_object::{DataObject, MaterializedVariable};
use crate::app::models::MissingValue;
use crate::config::{CompressionAlgorithm, Settings};
use crate::{Error, Result};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Destination for the variables of one output partition
pub trait StorageBackend {
    fn write_variable(&mut self, variable: MaterializedVariable) -> Result<()>;
}

/// In-memory columnar store for one partition
///
/// Every variable must carry the same record count and no two variables may
/// emit the same column name. The store can be turned into a polars DataFrame,
/// written as parquet, or read back variable by variable.
#[derive(Debug, Clone, Default)]
pub struct FrameStore {
    variables: Vec<MaterializedVariable>,
    index: HashMap<String, usize>,
    columns: HashSet<String>,
    rows: Option<usize>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(&self, name: &str) -> Option<&MaterializedVariable> {
        self.index.get(name).map(|&i| &self.variables[i])
    }

    pub fn variables(&self) -> &[MaterializedVariable] {
        &self.variables
    }

    /// Variable names in write order
    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Record count shared by the stored variables
    pub fn row_count(&self) -> usize {
        self.rows.unwrap_or(0)
    }

    /// Decode a stored variable back into an artifact
    pub fn read_artifact(&self, name: &str, missing: &MissingValue) -> Result<DataObject> {
        self.variable(name)
            .ok_or_else(|| Error::field_not_found(name))?
            .to_data_object(missing)
    }

    /// All stored columns as one DataFrame
    pub fn to_data_frame(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .variables
            .iter()
            .flat_map(|variable| variable.columns.iter().cloned().map(Column::from))
            .collect();

        if columns.is_empty() {
            return Ok(DataFrame::empty());
        }

        DataFrame::new(columns)
            .map_err(|e| Error::storage("Failed to assemble output columns", e))
    }

    /// Codec for the whole file: the variables' own choice, else the setting
    ///
    /// A parquet file written here carries one codec, so variables asking for
    /// different codecs cannot share a file.
    pub fn compression(&self, settings: &Settings) -> Result<CompressionAlgorithm> {
        let mut chosen: Option<(&str, CompressionAlgorithm)> = None;

        for variable in &self.variables {
            let Some(codec) = variable.compression else { continue };
            match chosen {
                Some((first, other)) if other != codec => {
                    return Err(Error::invalid_config(
                        format!("{}::compression", variable.name),
                        format!("the codec {:?} already chosen by '{}'", other, first),
                    ));
                }
                Some(_) => {}
                None => chosen = Some((variable.name.as_str(), codec)),
            }
        }

        Ok(chosen.map_or(settings.compression, |(_, codec)| codec))
    }

    /// Write the store as a parquet file, returning the number of records written
    pub fn write_parquet(&self, path: &Path, settings: &Settings) -> Result<usize> {
        let compression = self.compression(settings)?;
        let mut df = self.to_data_frame()?;
        let file = std::fs::File::create(path)
            .map_err(|e| Error::io(format!("Failed to create {}", path.display()), e))?;

        ParquetWriter::new(file)
            .with_compression(compression.to_polars_compression())
            .with_statistics(settings.statistics())
            .with_row_group_size(Some(settings.row_group_size))
            .finish(&mut df)
            .map_err(|e| {
                Error::storage(format!("Failed to write parquet {}", path.display()), e)
            })?;

        info!(
            "Wrote {} records in {} columns to {}",
            df.height(),
            df.width(),
            path.display()
        );
        Ok(df.height())
    }
}

impl StorageBackend for FrameStore {
    fn write_variable(&mut self, variable: MaterializedVariable) -> Result<()> {
        if self.index.contains_key(&variable.name) {
            return Err(Error::duplicate_name("output variable", variable.name));
        }

        let rows = variable.row_count();
        if let Some(column) = variable.columns.iter().find(|c| c.len() != rows) {
            return Err(Error::shape_mismatch(
                variable.name.as_str(),
                format!("column '{}' has {} values, expected {}", column.name(), column.len(), rows),
            ));
        }

        if let Some(column) = variable
            .columns
            .iter()
            .find(|c| self.columns.contains(c.name().as_str()))
        {
            return Err(Error::duplicate_name("output column", column.name().as_str()));
        }

        match self.rows {
            Some(expected) if expected != rows => {
                return Err(Error::shape_mismatch(
                    variable.name,
                    format!("{} records but the store holds {}", rows, expected),
                ));
            }
            Some(_) => {}
            None => self.rows = Some(rows),
        }

        debug!(
            "Stored '{}' over [{}]",
            variable.name,
            variable.dimensions.join(", ")
        );
        self.columns
            .extend(variable.columns.iter().map(|c| c.name().to_string()));
        self.index.insert(variable.name.clone(), self.variables.len());
        self.variables.push(variable);
        Ok(())
    }
}
