//! Output layout: named dimensions and the variables written against them

use super::data_object::MaterializeOptions;
use crate::app::services::export::Export;
use crate::config::{CompressionAlgorithm, Settings};
use crate::constants::VARIABLE_SOURCE_PREFIX;
use crate::schema::{
    ConfKey, ConfNode, OUTPUT_DIMENSION_KEYS, OUTPUT_KEYS, OUTPUT_VARIABLE_KEYS,
};
use crate::{Error, Result};
use std::collections::BTreeSet;

/// How a secondary dimension gets its extent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionSize {
    Fixed(usize),
    /// Column count of the named export variable in the current partition
    FromVariable(String),
}

/// Secondary output dimension (the location dimension is implicit)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSpec {
    pub name: String,
    pub size: DimensionSize,
}

impl DimensionSpec {
    pub fn fixed(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size: DimensionSize::Fixed(size),
        }
    }

    pub fn from_variable(name: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: DimensionSize::FromVariable(variable.into()),
        }
    }
}

/// One variable written to the store
#[derive(Debug, Clone, PartialEq)]
pub struct OutputVariable {
    /// Output name, e.g. `MetaData/latitude`
    pub name: String,
    /// Export variable providing the data
    pub source: String,
    /// Dimension names, location dimension first
    pub dimensions: Vec<String>,
    pub options: MaterializeOptions,
}

impl OutputVariable {
    pub fn new(name: impl Into<String>, source: impl Into<String>, dimensions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            source: strip_source_prefix(&source.into()).to_string(),
            dimensions,
            options: MaterializeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MaterializeOptions) -> Self {
        self.options = options;
        self
    }
}

/// Output description for one export
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    location_dimension: String,
    dimensions: Vec<DimensionSpec>,
    variables: Vec<OutputVariable>,
}

impl Description {
    pub fn new(location_dimension: impl Into<String>) -> Self {
        Self {
            location_dimension: location_dimension.into(),
            dimensions: Vec::new(),
            variables: Vec::new(),
        }
    }

    pub fn with_dimension(mut self, dimension: DimensionSpec) -> Self {
        self.dimensions.push(dimension);
        self
    }

    pub fn with_variable(mut self, variable: OutputVariable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Build from the `output` section, checking every reference against the export
    pub fn from_conf(node: &ConfNode<'_>, export: &Export, settings: &Settings) -> Result<Self> {
        node.validate(OUTPUT_KEYS)?;

        let location_dimension = node
            .opt_string(ConfKey::LocationDimension)?
            .unwrap_or_else(|| settings.location_dimension.clone());
        let mut description = Self::new(location_dimension);

        let mut dimension_names = BTreeSet::from([description.location_dimension.clone()]);
        if let Some(list) = node.get(ConfKey::Dimensions) {
            for item in list.items()? {
                let dimension = parse_dimension(&item, export)?;
                if !dimension_names.insert(dimension.name.clone()) {
                    return Err(Error::duplicate_name("dimension", dimension.name));
                }
                description.dimensions.push(dimension);
            }
        }

        let mut output_names = BTreeSet::new();
        for item in node.child(ConfKey::Variables)?.items()? {
            let variable = parse_variable(&item, export, &description)?;
            for dimension in &variable.dimensions {
                if !dimension_names.contains(dimension) {
                    return Err(Error::invalid_config(
                        format!("{}::{}", item.path(), ConfKey::Dimensions.as_str()),
                        format!("a declared dimension (found '{}')", dimension),
                    ));
                }
            }
            if !output_names.insert(variable.name.clone()) {
                return Err(Error::duplicate_name("output variable", variable.name));
            }
            description.variables.push(variable);
        }

        Ok(description)
    }

    pub fn location_dimension(&self) -> &str {
        &self.location_dimension
    }

    pub fn dimensions(&self) -> &[DimensionSpec] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&DimensionSpec> {
        self.dimensions.iter().find(|dim| dim.name == name)
    }

    pub fn variables(&self) -> &[OutputVariable] {
        &self.variables
    }
}

/// `variables/<name>` and `<name>` both refer to export variable `<name>`
fn strip_source_prefix(source: &str) -> &str {
    source.strip_prefix(VARIABLE_SOURCE_PREFIX).unwrap_or(source)
}

fn check_source(node: &ConfNode<'_>, source: &str, export: &Export) -> Result<String> {
    let name = strip_source_prefix(source);
    if export.variable(name).is_none() {
        return Err(Error::missing_config(format!(
            "{}::{} -> export::variables::{}",
            node.path(),
            ConfKey::Source.as_str(),
            name
        )));
    }
    Ok(name.to_string())
}

fn parse_dimension(node: &ConfNode<'_>, export: &Export) -> Result<DimensionSpec> {
    node.validate(OUTPUT_DIMENSION_KEYS)?;
    let name = node.string(ConfKey::Name)?;

    match (node.get(ConfKey::Size), node.get(ConfKey::Source)) {
        (Some(size), None) => Ok(DimensionSpec::fixed(name, size.as_usize()?)),
        (None, Some(source)) => Ok(DimensionSpec::from_variable(
            name,
            check_source(node, source.as_str()?, export)?,
        )),
        (Some(_), Some(_)) => Err(Error::invalid_config(
            node.path(),
            "either a size or a source, not both",
        )),
        (None, None) => Err(Error::missing_config(format!(
            "{}::{}",
            node.path(),
            ConfKey::Size.as_str()
        ))),
    }
}

fn parse_variable(
    node: &ConfNode<'_>,
    export: &Export,
    description: &Description,
) -> Result<OutputVariable> {
    node.validate(OUTPUT_VARIABLE_KEYS)?;

    let name = node.string(ConfKey::Name)?;
    let source = check_source(node, &node.string(ConfKey::Source)?, export)?;

    let dimensions = match node.get(ConfKey::Dimensions) {
        Some(list) => list.as_string_list()?,
        None => vec![description.location_dimension.clone()],
    };
    if dimensions.first() != Some(&description.location_dimension) {
        return Err(Error::invalid_config(
            format!("{}::{}", node.path(), ConfKey::Dimensions.as_str()),
            format!("a list starting with '{}'", description.location_dimension),
        ));
    }

    let chunks = match node.get(ConfKey::Chunks) {
        Some(list) => list
            .items()?
            .iter()
            .map(ConfNode::as_usize)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let options = MaterializeOptions {
        chunks,
        fill_value: node.opt_float(ConfKey::FillValue)?,
        compression: parse_compression(node)?,
        long_name: node.opt_string(ConfKey::LongName)?,
        units: node.opt_string(ConfKey::Units)?,
    };

    Ok(OutputVariable {
        name,
        source,
        dimensions,
        options,
    })
}

fn parse_compression(node: &ConfNode<'_>) -> Result<Option<CompressionAlgorithm>> {
    let Some(codec) = node.opt_string(ConfKey::Compression)? else {
        return Ok(None);
    };

    let algorithm = match codec.as_str() {
        "snappy" => CompressionAlgorithm::Snappy,
        "zstd" => CompressionAlgorithm::Zstd,
        "lz4" => CompressionAlgorithm::Lz4,
        "uncompressed" => CompressionAlgorithm::Uncompressed,
        other => {
            return Err(Error::invalid_config(
                format!("{}::{}", node.path(), ConfKey::Compression.as_str()),
                format!("one of snappy, zstd, lz4, uncompressed (found '{}')", other),
            ));
        }
    };

    Ok(Some(algorithm))
}
