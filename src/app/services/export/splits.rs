//! Category splits partitioning a batch into named row subsets
//!
//! Every split groups rows by the integer value of one categorical field. Each
//! partition is encoded independently downstream, so two categories must never
//! share a partition name.

use crate::app::models::{FieldValues, MissingValue, RawFieldMap};
use crate::constants::MISSING_CATEGORY_NAME;
use crate::schema::{CATEGORY_KEYS, ConfKey, ConfNode};
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Partition name → indices of the rows it holds (ascending)
pub type Partitions = BTreeMap<String, Vec<usize>>;

/// Splits rows by an integer category code, naming partitions through an optional map
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySplit {
    mnemonic: String,
    name_map: BTreeMap<i64, String>,
}

impl CategorySplit {
    /// Create a split, rejecting maps that give two codes the same name
    pub fn new(mnemonic: impl Into<String>, name_map: BTreeMap<i64, String>) -> Result<Self> {
        let mnemonic = mnemonic.into();

        let mut seen = BTreeMap::new();
        for (code, name) in &name_map {
            if let Some(previous) = seen.insert(name.as_str(), *code) {
                debug!(
                    "Category codes {} and {} of '{}' both map to '{}'",
                    previous, code, mnemonic, name
                );
                return Err(Error::ambiguous_split(mnemonic, name.as_str()));
            }
        }

        Ok(Self { mnemonic, name_map })
    }

    /// Build from an `export::splits::<name>::category` block
    pub fn from_conf(node: &ConfNode<'_>) -> Result<Self> {
        node.validate(CATEGORY_KEYS)?;

        let mut name_map = BTreeMap::new();
        if let Some(map) = node.get(ConfKey::NameMap) {
            for (key, value) in map.entries()? {
                name_map.insert(parse_category_code(key, &value)?, value.as_str()?.to_string());
            }
        }

        Self::new(node.string(ConfKey::Mnemonic)?, name_map)
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn name_map(&self) -> &BTreeMap<i64, String> {
        &self.name_map
    }

    /// Name of the partition holding category `code`
    pub fn partition_name(&self, code: i64) -> String {
        self.name_map
            .get(&code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    /// Group the batch's rows by category
    ///
    /// Rows with a missing category land in the `missing` partition. Every row
    /// appears in exactly one partition.
    pub fn partition(
        &self,
        split_name: &str,
        data: &RawFieldMap,
        missing: &MissingValue,
    ) -> Result<Partitions> {
        let array = match data.get(&self.mnemonic) {
            Some(FieldValues::Numeric(array)) => array,
            Some(FieldValues::Strings(_)) => {
                return Err(Error::type_mismatch(
                    self.mnemonic.as_str(),
                    "category splits require a numeric field",
                ));
            }
            None => return Err(Error::field_not_found(self.mnemonic.as_str())),
        };

        if array.cols() == 0 {
            return Err(Error::shape_mismatch(
                self.mnemonic.as_str(),
                "category field has no columns",
            ));
        }

        // Partition name → the category key that claimed it
        let mut owners: BTreeMap<String, Option<i64>> = BTreeMap::new();
        let mut partitions = Partitions::new();

        for row in 0..array.rows() {
            let value = array.row(row)[0];
            let code = missing.is_present(value).then(|| value.round() as i64);
            let name = match code {
                Some(code) => self.partition_name(code),
                None => MISSING_CATEGORY_NAME.to_string(),
            };

            match owners.get(&name) {
                Some(owner) if *owner != code => {
                    return Err(Error::ambiguous_split(split_name, name));
                }
                Some(_) => {}
                None => {
                    owners.insert(name.clone(), code);
                }
            }

            partitions.entry(name).or_default().push(row);
        }

        debug!(
            "Split '{}' on '{}' produced {} partitions",
            split_name,
            self.mnemonic,
            partitions.len()
        );

        Ok(partitions)
    }
}

/// Map keys are `"<code>"` or the YAML-safe `"_<code>"`
fn parse_category_code(key: &str, value: &ConfNode<'_>) -> Result<i64> {
    key.trim_start_matches('_')
        .parse::<i64>()
        .map_err(|_| Error::invalid_config(value.path(), "an integer category code as key"))
}

/// Row partitioner, one variant per configured kind
#[derive(Debug, Clone, PartialEq)]
pub enum Split {
    Category(CategorySplit),
}

impl Split {
    /// Build a split from one entry of `export::splits`
    pub fn from_conf(node: &ConfNode<'_>) -> Result<Self> {
        if let Some(category) = node.get(ConfKey::Category) {
            Ok(Split::Category(CategorySplit::from_conf(&category)?))
        } else {
            let found = node.keys().first().copied().unwrap_or("<empty>").to_string();
            Err(Error::unknown_kind("split", node.path(), found))
        }
    }

    pub fn mnemonic(&self) -> &str {
        match self {
            Split::Category(split) => split.mnemonic(),
        }
    }

    pub fn apply(
        &self,
        split_name: &str,
        data: &RawFieldMap,
        missing: &MissingValue,
    ) -> Result<Partitions> {
        match self {
            Split::Category(split) => split.partition(split_name, data, missing),
        }
    }
}
