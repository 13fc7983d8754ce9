//! Error handling for the BUFR export pipeline.
//!
//! Configuration faults surface when an [`Export`](crate::app::services::export::Export)
//! is built, data faults surface when a record batch is assembled, resolved or encoded.
//! Nothing is retried or downgraded to a warning.

use thiserror::Error;

/// Result type alias for the ingester
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds raised by configuration parsing, assembly, resolution and encoding
#[derive(Error, Debug)]
pub enum Error {
    /// A required configuration key is absent
    #[error("Missing required configuration: {path}")]
    MissingRequiredConfig { path: String },

    /// A configuration value has the wrong shape or cannot be parsed
    #[error("Invalid configuration value at '{path}': expected {expected}")]
    InvalidConfigValue { path: String, expected: String },

    /// A variable/filter/split/transform block matches none of the known shapes
    #[error("Unknown {family} kind at '{path}': {found}")]
    UnknownEntityKind {
        family: String,
        path: String,
        found: String,
    },

    /// Two entities of the same family share a name
    #[error("Duplicate {family} name: {name}")]
    DuplicateName { family: String, name: String },

    /// Every candidate source field is absent or entirely missing
    #[error("None of mnemonic(s) [{candidates}] could be resolved for variable '{variable}'")]
    UnresolvableVariable {
        variable: String,
        candidates: String,
    },

    /// Repeat counts of a field disagree with its data or with its siblings
    #[error("Structural mismatch for field '{field}' in record {record}: {message}")]
    StructuralMismatch {
        field: String,
        record: usize,
        message: String,
    },

    /// Row/column counts disagree with what is configured or expected
    #[error("Shape mismatch for '{name}': {message}")]
    ShapeMismatch { name: String, message: String },

    /// Two category partitions resolve to the same output name
    #[error("Ambiguous split name '{name}' in split '{split}'")]
    AmbiguousSplitName { split: String, name: String },

    /// A filter or split targets a field the batch does not contain
    #[error("Field not found: {name}")]
    FieldNotFound { name: String },

    /// A numeric operation was requested on string data, or the reverse
    #[error("Type mismatch for field '{name}': {message}")]
    TypeMismatch { name: String, message: String },

    /// A transform would turn an observed value into the missing sentinel
    #[error("Transform {transform} on variable '{variable}' maps observed value {value} into the missing range")]
    TransformOutOfRange {
        variable: String,
        transform: String,
        value: f64,
    },

    /// The configuration document is not valid JSON
    #[error("Configuration parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Settings failed validation or the logger could not be installed
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The columnar store rejected a write or read
    #[error("Storage backend error: {message}")]
    Storage {
        message: String,
        #[source]
        source: polars::error::PolarsError,
    },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a missing configuration error
    pub fn missing_config(path: impl Into<String>) -> Self {
        Self::MissingRequiredConfig { path: path.into() }
    }

    /// Create an invalid configuration value error
    pub fn invalid_config(path: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            path: path.into(),
            expected: expected.into(),
        }
    }

    /// Create an unknown entity kind error
    pub fn unknown_kind(
        family: impl Into<String>,
        path: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnknownEntityKind {
            family: family.into(),
            path: path.into(),
            found: found.into(),
        }
    }

    /// Create a duplicate name error
    pub fn duplicate_name(family: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            family: family.into(),
            name: name.into(),
        }
    }

    /// Create an unresolvable variable error from the candidate list
    pub fn unresolvable(variable: impl Into<String>, candidates: &[String]) -> Self {
        Self::UnresolvableVariable {
            variable: variable.into(),
            candidates: candidates.join(", "),
        }
    }

    /// Create a structural mismatch error
    pub fn structural_mismatch(
        field: impl Into<String>,
        record: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::StructuralMismatch {
            field: field.into(),
            record,
            message: message.into(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an ambiguous split name error
    pub fn ambiguous_split(split: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AmbiguousSplitName {
            split: split.into(),
            name: name.into(),
        }
    }

    /// Create a field not found error
    pub fn field_not_found(name: impl Into<String>) -> Self {
        Self::FieldNotFound { name: name.into() }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a transform range error
    pub fn transform_out_of_range(
        variable: impl Into<String>,
        transform: impl Into<String>,
        value: f64,
    ) -> Self {
        Self::TransformOutOfRange {
            variable: variable.into(),
            transform: transform.into(),
            value,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a storage error with context
    pub fn storage(message: impl Into<String>, source: polars::error::PolarsError) -> Self {
        Self::Storage {
            message: message.into(),
            source,
        }
    }

    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::ConfigParse {
            message: "Invalid configuration document".to_string(),
            source: error,
        }
    }
}

impl From<polars::error::PolarsError> for Error {
    fn from(error: polars::error::PolarsError) -> Self {
        Self::Storage {
            message: "Columnar store operation failed".to_string(),
            source: error,
        }
    }
}
