//! Per-record decoded fields

use crate::{Error, Result};
use std::collections::HashMap;

/// Leaf values of one field in one record
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Numeric(Vec<f64>),
    Strings(Vec<String>),
}

impl FieldData {
    pub fn len(&self) -> usize {
        match self {
            FieldData::Numeric(values) => values.len(),
            FieldData::Strings(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_string(&self) -> bool {
        matches!(self, FieldData::Strings(_))
    }
}

/// One decoded field of one record, with its repetition structure
///
/// `seq_counts[k]` holds the repeat counts of nesting level `k`: level 0 has a
/// single entry, level `k` one entry per instance of level `k - 1`. The leaf
/// value count is the sum of the deepest level, or 1 for a field outside any
/// repeated group. `seq_path` identifies the repeated group behind each level.
#[derive(Debug, Clone, PartialEq)]
pub struct DataField {
    pub name: String,
    pub query: String,
    pub data: FieldData,
    pub missing: bool,
    pub seq_path: Vec<usize>,
    pub seq_counts: Vec<Vec<usize>>,
    pub dim_paths: Vec<String>,
}

impl DataField {
    /// Single numeric value outside any repeated group
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        let name = name.into();
        Self {
            query: name.clone(),
            name,
            data: FieldData::Numeric(vec![value]),
            missing: false,
            seq_path: Vec::new(),
            seq_counts: Vec::new(),
            dim_paths: Vec::new(),
        }
    }

    /// Single string value outside any repeated group
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            query: name.clone(),
            name,
            data: FieldData::Strings(vec![value.into()]),
            missing: false,
            seq_path: Vec::new(),
            seq_counts: Vec::new(),
            dim_paths: Vec::new(),
        }
    }

    /// Field inside one or more repeated groups
    pub fn repeated(
        name: impl Into<String>,
        data: FieldData,
        seq_path: Vec<usize>,
        seq_counts: Vec<Vec<usize>>,
    ) -> Self {
        let name = name.into();
        Self {
            query: name.clone(),
            name,
            data,
            missing: false,
            seq_path,
            seq_counts,
            dim_paths: Vec::new(),
        }
    }

    /// Placeholder for a field the decoder could not find in the record
    pub fn absent(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            query: name.clone(),
            name,
            data: FieldData::Numeric(Vec::new()),
            missing: true,
            seq_path: Vec::new(),
            seq_counts: Vec::new(),
            dim_paths: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_dim_paths(mut self, dim_paths: Vec<String>) -> Self {
        self.dim_paths = dim_paths;
        self
    }

    /// Nesting depth
    pub fn depth(&self) -> usize {
        self.seq_counts.len()
    }

    /// Leaf count implied by the repeat counts
    pub fn expected_len(&self) -> usize {
        self.seq_counts
            .last()
            .map_or(1, |level| level.iter().sum())
    }

    /// Check the repeat counts against each other and against the data
    pub fn validate(&self, record: usize) -> Result<()> {
        let mismatch = |message: String| {
            Err(Error::structural_mismatch(self.name.as_str(), record, message))
        };

        if self.seq_path.len() != self.seq_counts.len() {
            return mismatch(format!(
                "{} sequence ids for {} repeat levels",
                self.seq_path.len(),
                self.seq_counts.len()
            ));
        }

        let mut instances = 1;
        for (level, counts) in self.seq_counts.iter().enumerate() {
            if counts.len() != instances {
                return mismatch(format!(
                    "level {} has {} repeat counts but its parent has {} instances",
                    level,
                    counts.len(),
                    instances
                ));
            }
            instances = counts.iter().sum();
        }

        if !self.missing && self.data.len() != self.expected_len() {
            return mismatch(format!(
                "{} values but the repeat counts imply {}",
                self.data.len(),
                self.expected_len()
            ));
        }

        Ok(())
    }
}

/// Decoded fields of one record, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    fields: Vec<DataField>,
    index: HashMap<String, usize>,
}

impl DataFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, rejecting a second field with the same name
    pub fn add_field(&mut self, field: DataField) -> Result<()> {
        if self.index.contains_key(&field.name) {
            return Err(Error::duplicate_name("field", field.name));
        }

        self.index.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    /// Builder form of [`add_field`](Self::add_field)
    pub fn with_field(mut self, field: DataField) -> Result<Self> {
        self.add_field(field)?;
        Ok(self)
    }

    pub fn field(&self, name: &str) -> Option<&DataField> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn fields(&self) -> &[DataField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
