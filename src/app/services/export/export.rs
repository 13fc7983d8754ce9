//! The export aggregate: filters, splits and variables built from one config section

use super::filters::{Filter, combined_mask, retained_rows};
use super::splits::{Partitions, Split};
use super::variables::Variable;
use crate::app::models::{MissingValue, RawFieldMap};
use crate::constants::{DEFAULT_PARTITION_NAME, PARTITION_NAME_SEPARATOR};
use crate::schema::{ConfKey, ConfNode, EXPORT_KEYS};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Immutable export configuration
///
/// Variables and splits are keyed by their configured names and iterate in
/// name order; filters keep their declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    variables: BTreeMap<String, Variable>,
    splits: BTreeMap<String, Split>,
    filters: Vec<Filter>,
}

impl Export {
    /// Assemble an export from already-built parts, rejecting duplicate names
    pub fn new(
        filters: Vec<Filter>,
        splits: Vec<(String, Split)>,
        variables: Vec<(String, Variable)>,
    ) -> Result<Self> {
        if variables.is_empty() {
            return Err(Error::missing_config(ConfKey::Variables.as_str()));
        }

        Ok(Self {
            variables: unique("variable", variables)?,
            splits: unique("split", splits)?,
            filters,
        })
    }

    /// Build from the `export` section of a configuration tree
    pub fn from_conf(node: &ConfNode<'_>) -> Result<Self> {
        node.validate(EXPORT_KEYS)?;

        let mut filters = Vec::new();
        if let Some(list) = node.get(ConfKey::Filters) {
            let items = list.items()?;
            if items.is_empty() {
                return Err(Error::invalid_config(list.path(), "a non-empty list"));
            }
            for item in &items {
                filters.push(Filter::from_conf(item)?);
            }
        }

        let mut splits = Vec::new();
        if let Some(map) = node.get(ConfKey::Splits) {
            let entries = map.entries()?;
            if entries.is_empty() {
                return Err(Error::invalid_config(map.path(), "a non-empty map"));
            }
            for (name, entry) in &entries {
                splits.push((name.to_string(), Split::from_conf(entry)?));
            }
        }

        let map = node.child(ConfKey::Variables)?;
        let entries = map.entries()?;
        if entries.is_empty() {
            return Err(Error::invalid_config(map.path(), "a non-empty map"));
        }
        let mut variables = Vec::with_capacity(entries.len());
        for (name, entry) in &entries {
            variables.push((name.to_string(), Variable::from_conf(entry)?));
        }

        let export = Self::new(filters, splits, variables)?;
        info!(
            "Export configured with {} variables, {} splits, {} filters",
            export.variables.len(),
            export.splits.len(),
            export.filters.len()
        );
        Ok(export)
    }

    /// Build from a tree holding either an `export` key or the section itself
    pub fn from_value(value: &Value) -> Result<Self> {
        let section = value.get(ConfKey::Export.as_str()).unwrap_or(value);
        Self::from_conf(&ConfNode::new(section, ConfKey::Export.as_str()))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn variables(&self) -> &BTreeMap<String, Variable> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn splits(&self) -> &BTreeMap<String, Split> {
        &self.splits
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Rows of the batch passing every filter, ascending
    pub fn retained_rows(&self, data: &RawFieldMap, missing: &MissingValue) -> Result<Vec<usize>> {
        let mask = combined_mask(&self.filters, data, missing)?;
        Ok(retained_rows(&mask))
    }

    /// Partition the batch over every split at once
    ///
    /// Each row's partition name joins its per-split names with `_` in split-name
    /// order. Without splits the whole batch is the single `all` partition.
    pub fn partitions(&self, data: &RawFieldMap, missing: &MissingValue) -> Result<Partitions> {
        let rows = data.row_count();

        if self.splits.is_empty() {
            let mut partitions = Partitions::new();
            partitions.insert(DEFAULT_PARTITION_NAME.to_string(), (0..rows).collect());
            return Ok(partitions);
        }

        let mut parts: Vec<Vec<String>> = vec![Vec::with_capacity(self.splits.len()); rows];
        for (split_name, split) in &self.splits {
            for (partition, indices) in split.apply(split_name, data, missing)? {
                for row in indices {
                    parts[row].push(partition.clone());
                }
            }
        }

        // Joined names must stay unambiguous across splits too
        let mut owners: BTreeMap<String, &[String]> = BTreeMap::new();
        let mut partitions = Partitions::new();
        for (row, names) in parts.iter().enumerate() {
            let joined = names.join(PARTITION_NAME_SEPARATOR);

            match owners.get(&joined) {
                Some(owner) if *owner != names.as_slice() => {
                    let split_names: Vec<&str> = self.splits.keys().map(String::as_str).collect();
                    return Err(Error::ambiguous_split(split_names.join(","), joined));
                }
                Some(_) => {}
                None => {
                    owners.insert(joined.clone(), names.as_slice());
                }
            }

            partitions.entry(joined).or_default().push(row);
        }

        debug!(
            "{} splits produced {} partitions",
            self.splits.len(),
            partitions.len()
        );
        Ok(partitions)
    }
}

fn unique<T>(family: &str, entries: Vec<(String, T)>) -> Result<BTreeMap<String, T>> {
    let mut map = BTreeMap::new();
    for (name, entry) in entries {
        if map.contains_key(&name) {
            return Err(Error::duplicate_name(family, name));
        }
        map.insert(name, entry);
    }
    Ok(map)
}
