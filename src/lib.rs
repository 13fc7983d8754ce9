//! BUFR Ingester Library
//!
//! A Rust library for turning decoded BUFR observation fields into typed,
//! dimensioned arrays ready for a columnar observation store.
//!
//! This library provides tools for:
//! - Assembling hierarchical query results into flat per-field arrays
//! - Resolving export variables from mnemonic candidates and datetime components
//! - Applying scale/offset transforms with missing-value preservation
//! - Filtering records by bounds and splitting them into named partitions
//! - Materializing variables against declared dimensions and writing Parquet

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod schema;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services;
}

// Re-export commonly used types
pub use app::models::{Array2, FieldValues, MissingValue, RawFieldMap};
pub use app::services::encoder::{Description, EncodeResult, Encoder, FrameStore};
pub use app::services::export::{Export, Variable};
pub use app::services::result_set::ResultSet;
pub use config::{PipelineConfig, Settings};
pub use error::{Error, Result};
