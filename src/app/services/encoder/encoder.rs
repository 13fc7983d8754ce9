//! Batch encoding: filter, split, resolve and materialize

use super::backend::{FrameStore, StorageBackend};
use super::data_object::{DataObject, Dimension};
use super::description::{Description, DimensionSize, OutputVariable};
use crate::app::models::{MissingValue, RawFieldMap};
use crate::app::services::export::Export;
use crate::config::{PipelineConfig, Settings};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Counters for one encoded batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodingStats {
    pub records_in: usize,
    pub records_retained: usize,
    pub partitions_written: usize,
    pub partitions_skipped: usize,
    pub variables_written: usize,
}

impl fmt::Display for EncodingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} records retained, {} partitions written ({} skipped), {} variables",
            self.records_retained,
            self.records_in,
            self.partitions_written,
            self.partitions_skipped,
            self.variables_written
        )
    }
}

/// Partition name → in-memory store, plus batch counters
#[derive(Debug, Clone, Default)]
pub struct EncodeResult {
    pub outputs: BTreeMap<String, FrameStore>,
    pub stats: EncodingStats,
}

/// Runs an export over record batches and writes the output description
#[derive(Debug, Clone)]
pub struct Encoder {
    description: Description,
    settings: Settings,
}

impl Encoder {
    pub fn new(description: Description, settings: Settings) -> Self {
        Self {
            description,
            settings,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.description.clone(), config.settings.clone())
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Encode a batch into in-memory stores, one per partition
    pub fn encode(&self, export: &Export, data: &RawFieldMap) -> Result<EncodeResult> {
        let (outputs, stats) = self.encode_with(export, data, |_| FrameStore::new())?;
        Ok(EncodeResult { outputs, stats })
    }

    /// Encode a batch into backends created per partition by `new_backend`
    ///
    /// Filters run first, then splits, then every export variable is resolved
    /// for each partition. Any failure aborts the whole batch.
    pub fn encode_with<B, F>(
        &self,
        export: &Export,
        data: &RawFieldMap,
        mut new_backend: F,
    ) -> Result<(BTreeMap<String, B>, EncodingStats)>
    where
        B: StorageBackend,
        F: FnMut(&str) -> B,
    {
        let missing = self.settings.missing();
        let mut stats = EncodingStats {
            records_in: data.validate_rows()?,
            ..EncodingStats::default()
        };

        let retained = export.retained_rows(data, &missing)?;
        stats.records_retained = retained.len();
        let filtered = data.select_rows(&retained);

        let mut outputs = BTreeMap::new();
        for (partition, rows) in export.partitions(&filtered, &missing)? {
            if rows.is_empty() && self.settings.skip_empty_partitions {
                warn!("Skipping empty partition '{}'", partition);
                stats.partitions_skipped += 1;
                continue;
            }

            let subset = filtered.select_rows(&rows);
            let mut backend = new_backend(&partition);
            stats.variables_written += self.write_partition(export, &subset, &missing, &mut backend)?;
            stats.partitions_written += 1;

            debug!("Partition '{}' encoded with {} records", partition, rows.len());
            outputs.insert(partition, backend);
        }

        info!("Encoded batch: {}", stats);
        Ok((outputs, stats))
    }

    fn write_partition<B: StorageBackend>(
        &self,
        export: &Export,
        data: &RawFieldMap,
        missing: &MissingValue,
        backend: &mut B,
    ) -> Result<usize> {
        let mut resolved: BTreeMap<&str, DataObject> = BTreeMap::new();
        for (name, variable) in export.variables() {
            resolved.insert(name.as_str(), variable.resolve(name, data, missing)?);
        }

        let rows = data.row_count();
        for output in self.description.variables() {
            let object = resolved
                .get(output.source.as_str())
                .ok_or_else(|| missing_source(&output.source))?;
            let dimensions = self.dimensions(output, rows, &resolved)?;

            let variable = object.materialize(&output.name, &dimensions, &output.options, missing)?;
            backend.write_variable(variable)?;
        }

        Ok(self.description.variables().len())
    }

    /// Concrete dimensions of an output variable for the current partition
    fn dimensions(
        &self,
        output: &OutputVariable,
        rows: usize,
        resolved: &BTreeMap<&str, DataObject>,
    ) -> Result<Vec<Dimension>> {
        output
            .dimensions
            .iter()
            .map(|name| {
                if name == self.description.location_dimension() {
                    return Ok(Dimension::new(name.as_str(), rows));
                }

                let spec = self.description.dimension(name).ok_or_else(|| {
                    Error::shape_mismatch(
                        output.name.as_str(),
                        format!("dimension '{}' is not declared", name),
                    )
                })?;

                let size = match &spec.size {
                    DimensionSize::Fixed(size) => *size,
                    DimensionSize::FromVariable(source) => resolved
                        .get(source.as_str())
                        .ok_or_else(|| missing_source(source))?
                        .column_count(),
                };
                Ok(Dimension::new(name.as_str(), size))
            })
            .collect()
    }
}

fn missing_source(source: &str) -> Error {
    Error::missing_config(format!("export::variables::{}", source))
}
