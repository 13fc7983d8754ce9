//! Record-by-record accumulation of decoded fields
//!
//! The decoder emits one [`DataFrame`] per record, holding each requested field
//! with its repetition structure. A [`ResultSet`] collects those frames and
//! turns every field into a rectangular array, padding repeated groups to the
//! largest repeat count seen in the batch. [`ResultSet::to_raw_field_map`] is
//! the hand-off point to the export stage.
//!
//! - [`data_frame`] - Per-record field values and repeat counts
//! - [`result_set`] - Batch accumulation and hierarchical padding

pub mod data_frame;
#[allow(clippy::module_inception)]
pub mod result_set;

#[cfg(test)]
pub mod tests;

pub use data_frame::{DataField, DataFrame, FieldData};
pub use result_set::{FieldResult, ResultSet};
