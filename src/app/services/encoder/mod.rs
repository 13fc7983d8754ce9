//! Output encoding for resolved export variables
//!
//! This module takes an [`Export`](crate::app::services::export::Export) and a
//! record batch and produces shape-checked, columnar output for a storage
//! backend.
//!
//! # Architecture
//!
//! - [`data_object`] - Typed artifacts and their materialization
//! - [`description`] - Output dimensions and variables from the `output` section
//! - [`backend`] - The [`StorageBackend`] trait and the in-memory [`FrameStore`]
//! - [`encoder`] - Orchestration of filter, split, resolve and write
//!
//! # Example Usage
//!
//! ```rust
//! use bufr_ingester::app::models::RawFieldMap;
//! use bufr_ingester::app::services::encoder::Encoder;
//! use bufr_ingester::config::PipelineConfig;
//!
//! # fn example() -> bufr_ingester::Result<()> {
//! let config = PipelineConfig::from_json_str(
//!     r#"{
//!         "export": { "variables": { "latitude": { "mnemonic": "CLAT" } } },
//!         "output": { "variables": [ { "name": "MetaData/latitude", "source": "variables/latitude" } ] }
//!     }"#,
//! )?;
//!
//! let mut data = RawFieldMap::new();
//! data.insert_column("CLAT", vec![51.5, 52.0]);
//!
//! let result = Encoder::from_config(&config).encode(&config.export, &data)?;
//! assert_eq!(result.outputs["all"].row_count(), 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod backend;
pub mod data_object;
pub mod description;
#[allow(clippy::module_inception)]
pub mod encoder;

#[cfg(test)]
pub mod tests;

// Re-export main types for easy access
pub use backend::{FrameStore, StorageBackend};
pub use data_object::{
    DataObject, Dimension, MaterializeOptions, MaterializedVariable, NumericArtifact,
    StringArtifact,
};
pub use description::{Description, DimensionSize, DimensionSpec, OutputVariable};
pub use encoder::{EncodeResult, Encoder, EncodingStats};
