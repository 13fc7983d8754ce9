//! Export pipeline configuration and evaluation
//!
//! This module turns decoded record batches into output variables according to
//! the `export` configuration section.
//!
//! # Architecture
//!
//! - [`export`] - The [`Export`] aggregate built from configuration
//! - [`filters`] - Row filters combined before anything else runs
//! - [`splits`] - Category splits partitioning the retained rows
//! - [`variables`] - Candidate selection and datetime composition
//! - [`transforms`] - Value transforms applied to resolved variables
//!
//! # Evaluation Order
//!
//! 1. **Filters**: every filter's mask is AND-combined; failing rows are dropped
//! 2. **Splits**: retained rows are grouped into named partitions
//! 3. **Variables**: each variable is resolved once per partition
//!
//! # Example Usage
//!
//! ```rust
//! use bufr_ingester::app::models::{MissingValue, RawFieldMap};
//! use bufr_ingester::app::services::export::Export;
//!
//! # fn example() -> bufr_ingester::Result<()> {
//! let export = Export::from_json_str(
//!     r#"{ "variables": { "latitude": { "mnemonic": ["CLATH", "CLAT"] } } }"#,
//! )?;
//!
//! let mut data = RawFieldMap::new();
//! data.insert_column("CLAT", vec![51.5, 52.0]);
//!
//! let latitude = export.variables()["latitude"].resolve(
//!     "latitude",
//!     &data,
//!     &MissingValue::default(),
//! )?;
//! assert_eq!(latitude.row_count(), 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#[allow(clippy::module_inception)]
pub mod export;
pub mod filters;
pub mod splits;
pub mod transforms;
pub mod variables;

#[cfg(test)]
pub mod tests;

// Re-export main types for easy access
pub use export::Export;
pub use filters::{BoundingFilter, Filter, combined_mask, retained_rows};
pub use splits::{CategorySplit, Partitions, Split};
pub use transforms::{Transform, apply_transforms, make_transforms};
pub use variables::{
    DatetimeFormat, DatetimeSource, DatetimeVariable, MnemonicVariable, Variable,
};
