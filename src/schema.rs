//! Configuration schema and tree access.
//!
//! Every configuration key the pipeline understands is listed once in [`ConfKey`],
//! and each configuration section has a [`KeySpec`] table giving the expected value
//! kind and default of its keys. Sections are validated against their table once,
//! when the owning entity is constructed; [`ConfNode`] then walks the tree with
//! path-qualified errors.

use crate::{Error, Result};
use serde_json::Value;
use tracing::warn;

/// Configuration keys, by logical name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfKey {
    // Export sections
    Export,
    Filters,
    Splits,
    Variables,

    // Variables
    Datetime,
    Mnemonic,
    Transforms,

    // Datetime components
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    HoursFromUtc,
    Epoch,
    Format,

    // Splits
    Category,
    NameMap,

    // Filters
    Bounding,
    LowerBound,
    UpperBound,

    // Transforms
    Scale,
    Offset,

    // Output description
    Output,
    Settings,
    LocationDimension,
    Dimensions,
    Name,
    Size,
    Source,
    FillValue,
    Chunks,
    LongName,
    Units,
    Compression,
}

impl ConfKey {
    /// Key as spelled in the configuration document
    pub const fn as_str(self) -> &'static str {
        match self {
            ConfKey::Export => "export",
            ConfKey::Filters => "filters",
            ConfKey::Splits => "splits",
            ConfKey::Variables => "variables",
            ConfKey::Datetime => "datetime",
            ConfKey::Mnemonic => "mnemonic",
            ConfKey::Transforms => "transforms",
            ConfKey::Year => "year",
            ConfKey::Month => "month",
            ConfKey::Day => "day",
            ConfKey::Hour => "hour",
            ConfKey::Minute => "minute",
            ConfKey::Second => "second",
            ConfKey::HoursFromUtc => "hoursFromUtc",
            ConfKey::Epoch => "epoch",
            ConfKey::Format => "format",
            ConfKey::Category => "category",
            ConfKey::NameMap => "map",
            ConfKey::Bounding => "bounding",
            ConfKey::LowerBound => "lowerBound",
            ConfKey::UpperBound => "upperBound",
            ConfKey::Scale => "scale",
            ConfKey::Offset => "offset",
            ConfKey::Output => "output",
            ConfKey::Settings => "settings",
            ConfKey::LocationDimension => "locationDimension",
            ConfKey::Dimensions => "dimensions",
            ConfKey::Name => "name",
            ConfKey::Size => "size",
            ConfKey::Source => "source",
            ConfKey::FillValue => "fillValue",
            ConfKey::Chunks => "chunks",
            ConfKey::LongName => "longName",
            ConfKey::Units => "units",
            ConfKey::Compression => "compression",
        }
    }
}

/// Shape a configuration value must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Map,
    List,
    String,
    /// A single string or a list of strings
    StringOrList,
    Float,
    Integer,
}

impl ValueKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            ValueKind::Map => value.is_object(),
            ValueKind::List => value.is_array(),
            ValueKind::String => value.is_string(),
            ValueKind::StringOrList => {
                value.is_string()
                    || value
                        .as_array()
                        .is_some_and(|items| items.iter().all(Value::is_string))
            }
            ValueKind::Float => value.is_number(),
            ValueKind::Integer => value.as_i64().is_some(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ValueKind::Map => "a map",
            ValueKind::List => "a list",
            ValueKind::String => "a string",
            ValueKind::StringOrList => "a string or a list of strings",
            ValueKind::Float => "a number",
            ValueKind::Integer => "an integer",
        }
    }
}

/// Whether a key must be present, and what it defaults to otherwise
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    Default(f64),
}

/// One row of a section's schema table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeySpec {
    pub key: ConfKey,
    pub kind: ValueKind,
    pub presence: Presence,
}

const fn key(key: ConfKey, kind: ValueKind, presence: Presence) -> KeySpec {
    KeySpec {
        key,
        kind,
        presence,
    }
}

/// Top-level pipeline document
pub const DOCUMENT_KEYS: &[KeySpec] = &[
    key(ConfKey::Export, ValueKind::Map, Presence::Required),
    key(ConfKey::Output, ValueKind::Map, Presence::Required),
    key(ConfKey::Settings, ValueKind::Map, Presence::Optional),
];

/// `export`
pub const EXPORT_KEYS: &[KeySpec] = &[
    key(ConfKey::Filters, ValueKind::List, Presence::Optional),
    key(ConfKey::Splits, ValueKind::Map, Presence::Optional),
    key(ConfKey::Variables, ValueKind::Map, Presence::Required),
];

/// `export::variables::<name>`
pub const VARIABLE_KEYS: &[KeySpec] = &[
    key(ConfKey::Datetime, ValueKind::Map, Presence::Optional),
    key(ConfKey::Mnemonic, ValueKind::StringOrList, Presence::Optional),
    key(ConfKey::Transforms, ValueKind::List, Presence::Optional),
];

/// `export::variables::<name>::datetime`
pub const DATETIME_KEYS: &[KeySpec] = &[
    key(ConfKey::Year, ValueKind::String, Presence::Optional),
    key(ConfKey::Month, ValueKind::String, Presence::Optional),
    key(ConfKey::Day, ValueKind::String, Presence::Optional),
    key(ConfKey::Hour, ValueKind::String, Presence::Optional),
    key(ConfKey::Minute, ValueKind::String, Presence::Optional),
    key(ConfKey::Second, ValueKind::String, Presence::Optional),
    key(ConfKey::Epoch, ValueKind::String, Presence::Optional),
    key(ConfKey::HoursFromUtc, ValueKind::Integer, Presence::Default(0.0)),
    key(ConfKey::Format, ValueKind::String, Presence::Optional),
];

/// `export::splits::<name>::category`
pub const CATEGORY_KEYS: &[KeySpec] = &[
    key(ConfKey::Mnemonic, ValueKind::String, Presence::Required),
    key(ConfKey::NameMap, ValueKind::Map, Presence::Optional),
];

/// `export::filters[i]::bounding`
pub const BOUNDING_KEYS: &[KeySpec] = &[
    key(ConfKey::Mnemonic, ValueKind::String, Presence::Required),
    key(ConfKey::LowerBound, ValueKind::Float, Presence::Optional),
    key(ConfKey::UpperBound, ValueKind::Float, Presence::Optional),
];

/// `output`
pub const OUTPUT_KEYS: &[KeySpec] = &[
    key(ConfKey::LocationDimension, ValueKind::String, Presence::Optional),
    key(ConfKey::Dimensions, ValueKind::List, Presence::Optional),
    key(ConfKey::Variables, ValueKind::List, Presence::Required),
];

/// `output::dimensions[i]`
pub const OUTPUT_DIMENSION_KEYS: &[KeySpec] = &[
    key(ConfKey::Name, ValueKind::String, Presence::Required),
    key(ConfKey::Size, ValueKind::Integer, Presence::Optional),
    key(ConfKey::Source, ValueKind::String, Presence::Optional),
];

/// `output::variables[i]`
pub const OUTPUT_VARIABLE_KEYS: &[KeySpec] = &[
    key(ConfKey::Name, ValueKind::String, Presence::Required),
    key(ConfKey::Source, ValueKind::String, Presence::Required),
    key(ConfKey::Dimensions, ValueKind::List, Presence::Optional),
    key(ConfKey::FillValue, ValueKind::Float, Presence::Optional),
    key(ConfKey::Chunks, ValueKind::List, Presence::Optional),
    key(ConfKey::LongName, ValueKind::String, Presence::Optional),
    key(ConfKey::Units, ValueKind::String, Presence::Optional),
    key(ConfKey::Compression, ValueKind::String, Presence::Optional),
];

/// Borrowed view of one node in the configuration tree, tagged with its path
#[derive(Debug, Clone)]
pub struct ConfNode<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> ConfNode<'a> {
    /// Wrap a configuration value; `path` prefixes every error message
    pub fn new(value: &'a Value, path: impl Into<String>) -> Self {
        Self {
            value,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}::{}", self.path, key)
        }
    }

    /// True when the key is present and not null
    pub fn has(&self, key: ConfKey) -> bool {
        self.value
            .get(key.as_str())
            .is_some_and(|value| !value.is_null())
    }

    /// Child node under a known key
    pub fn get(&self, key: ConfKey) -> Option<ConfNode<'a>> {
        self.value
            .get(key.as_str())
            .filter(|value| !value.is_null())
            .map(|value| ConfNode::new(value, self.child_path(key.as_str())))
    }

    /// Child node under a known key, failing when absent
    pub fn child(&self, key: ConfKey) -> Result<ConfNode<'a>> {
        self.get(key)
            .ok_or_else(|| Error::missing_config(self.child_path(key.as_str())))
    }

    /// Keys of a map node, sorted by key
    pub fn keys(&self) -> Vec<&'a str> {
        let mut keys: Vec<&'a str> = self
            .value
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    /// Entries of a map node
    pub fn entries(&self) -> Result<Vec<(&'a str, ConfNode<'a>)>> {
        let map = self
            .value
            .as_object()
            .ok_or_else(|| Error::invalid_config(self.path.as_str(), "a map"))?;

        Ok(map
            .iter()
            .map(|(key, value)| (key.as_str(), ConfNode::new(value, self.child_path(key))))
            .collect())
    }

    /// Items of a list node
    pub fn items(&self) -> Result<Vec<ConfNode<'a>>> {
        let list = self
            .value
            .as_array()
            .ok_or_else(|| Error::invalid_config(self.path.as_str(), "a list"))?;

        Ok(list
            .iter()
            .enumerate()
            .map(|(index, value)| ConfNode::new(value, format!("{}[{}]", self.path, index)))
            .collect())
    }

    pub fn as_str(&self) -> Result<&'a str> {
        self.value
            .as_str()
            .ok_or_else(|| Error::invalid_config(self.path.as_str(), "a string"))
    }

    pub fn as_f64(&self) -> Result<f64> {
        self.value
            .as_f64()
            .ok_or_else(|| Error::invalid_config(self.path.as_str(), "a number"))
    }

    pub fn as_i64(&self) -> Result<i64> {
        self.value
            .as_i64()
            .ok_or_else(|| Error::invalid_config(self.path.as_str(), "an integer"))
    }

    pub fn as_usize(&self) -> Result<usize> {
        self.value
            .as_u64()
            .and_then(|value| usize::try_from(value).ok())
            .ok_or_else(|| Error::invalid_config(self.path.as_str(), "a non-negative integer"))
    }

    /// A single string, or a list of strings
    pub fn as_string_list(&self) -> Result<Vec<String>> {
        if let Some(single) = self.value.as_str() {
            return Ok(vec![single.to_string()]);
        }

        self.items()?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect()
    }

    pub fn string(&self, key: ConfKey) -> Result<String> {
        self.child(key)?.as_str().map(str::to_string)
    }

    pub fn opt_string(&self, key: ConfKey) -> Result<Option<String>> {
        self.get(key)
            .map(|node| node.as_str().map(str::to_string))
            .transpose()
    }

    pub fn opt_float(&self, key: ConfKey) -> Result<Option<f64>> {
        self.get(key).map(|node| node.as_f64()).transpose()
    }

    /// Numeric value of `key`, falling back to the table default
    pub fn float_or_default(&self, table: &[KeySpec], key: ConfKey) -> Result<f64> {
        if let Some(node) = self.get(key) {
            return node.as_f64();
        }

        match table.iter().find(|spec| spec.key == key).map(|spec| spec.presence) {
            Some(Presence::Default(value)) => Ok(value),
            _ => Err(Error::missing_config(self.child_path(key.as_str()))),
        }
    }

    /// Check this node against a section table
    ///
    /// Required keys must be present, present keys must have the declared kind.
    /// Keys missing from the table are logged and ignored.
    pub fn validate(&self, table: &[KeySpec]) -> Result<()> {
        let map = self
            .value
            .as_object()
            .ok_or_else(|| Error::invalid_config(self.path.as_str(), "a map"))?;

        for spec in table {
            match map.get(spec.key.as_str()).filter(|value| !value.is_null()) {
                Some(value) if !spec.kind.matches(value) => {
                    return Err(Error::invalid_config(
                        self.child_path(spec.key.as_str()),
                        spec.kind.describe(),
                    ));
                }
                Some(_) => {}
                None if spec.presence == Presence::Required => {
                    return Err(Error::missing_config(self.child_path(spec.key.as_str())));
                }
                None => {}
            }
        }

        for key in map.keys() {
            if !table.iter().any(|spec| spec.key.as_str() == key.as_str()) {
                warn!("Ignoring unrecognised configuration key '{}'", self.child_path(key));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_reports_missing_required_key() {
        let value = json!({ "filters": [] });
        let node = ConfNode::new(&value, "export");

        match node.validate(EXPORT_KEYS) {
            Err(Error::MissingRequiredConfig { path }) => assert_eq!(path, "export::variables"),
            other => panic!("expected missing config, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_reports_wrong_kind() {
        let value = json!({ "mnemonic": "CLAT", "lowerBound": "low" });
        let node = ConfNode::new(&value, "bounding");

        assert!(matches!(
            node.validate(BOUNDING_KEYS),
            Err(Error::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn test_keys_are_sorted() {
        let value = json!({ "upperBound": 90, "mnemonic": "CLAT", "lowerBound": -90 });
        let node = ConfNode::new(&value, "bounding");
        assert_eq!(node.keys(), vec!["lowerBound", "mnemonic", "upperBound"]);
    }

    #[test]
    fn test_validate_ignores_unknown_keys() {
        let value = json!({ "mnemonic": "CLAT", "comment": "latitude" });
        let node = ConfNode::new(&value, "bounding");
        assert!(node.validate(BOUNDING_KEYS).is_ok());
    }

    #[test]
    fn test_string_or_list() {
        let single = json!("CLAT");
        let list = json!(["CLATH", "CLAT"]);
        let bad = json!([1, 2]);

        assert_eq!(
            ConfNode::new(&single, "m").as_string_list().unwrap(),
            vec!["CLAT"]
        );
        assert_eq!(
            ConfNode::new(&list, "m").as_string_list().unwrap(),
            vec!["CLATH", "CLAT"]
        );
        assert!(ConfNode::new(&bad, "m").as_string_list().is_err());
    }

    #[test]
    fn test_float_or_default_uses_table() {
        let value = json!({ "year": "YEAR" });
        let node = ConfNode::new(&value, "datetime");

        assert_eq!(
            node.float_or_default(DATETIME_KEYS, ConfKey::HoursFromUtc).unwrap(),
            0.0
        );
        assert!(node.float_or_default(DATETIME_KEYS, ConfKey::Year).is_err());
    }

    #[test]
    fn test_item_paths_are_indexed() {
        let value = json!({ "filters": [{ "bounding": {} }] });
        let node = ConfNode::new(&value, "export");
        let items = node.child(ConfKey::Filters).unwrap().items().unwrap();
        assert_eq!(items[0].path(), "export::filters[0]");
    }
}
