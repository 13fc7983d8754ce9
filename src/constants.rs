//! Application constants for the BUFR ingester
//!
//! Missing-value convention, default dimension and partition names, and the
//! defaults used by the columnar store writer.

// =============================================================================
// Missing Value Convention
// =============================================================================

/// Sentinel the decoder writes for "no observation"
///
/// Two historical pairs exist (1e11/1e-9 and 1e10/1e-9). The repeated-group
/// collector and the candidate scan both use 1e11, so that is the convention.
pub const MISSING_VALUE: f64 = 1.0e11;

/// Tolerance absorbing floating point drift around the sentinel
pub const MISSING_EPSILON: f64 = 1.0e-9;

// =============================================================================
// Output Layout
// =============================================================================

/// Name of the record dimension every output variable starts with
pub const DEFAULT_LOCATION_DIMENSION: &str = "Location";

/// Partition name used when an export declares no splits
pub const DEFAULT_PARTITION_NAME: &str = "all";

/// Partition name for rows whose category value is missing
pub const MISSING_CATEGORY_NAME: &str = "missing";

/// Separator joining per-split names into one partition name
pub const PARTITION_NAME_SEPARATOR: &str = "_";

/// Prefix allowed on output `source` references (`variables/<name>`)
pub const VARIABLE_SOURCE_PREFIX: &str = "variables/";

// =============================================================================
// Columnar Store Defaults
// =============================================================================

/// Default row group size for parquet output
pub const DEFAULT_ROW_GROUP_SIZE: usize = 100_000;

/// Timestamp format emitted by string datetime variables
pub const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
