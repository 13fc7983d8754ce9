//! Tests for the export pipeline module
//!
//! Unit tests for transforms, filters, splits, variables and the Export aggregate.

pub mod filter_tests;
pub mod split_tests;

// Test helper functions and fixtures
use crate::app::models::{Array2, FieldValues, MissingValue, RawFieldMap};
use crate::constants::MISSING_VALUE;
use serde_json::Value;

/// Shorthand for the sentinel in fixtures
pub const M: f64 = MISSING_VALUE;

pub fn missing() -> MissingValue {
    MissingValue::default()
}

/// Map holding single-column numeric fields
pub fn column_map(fields: &[(&str, Vec<f64>)]) -> RawFieldMap {
    let mut map = RawFieldMap::new();
    for (name, values) in fields {
        map.insert_column(*name, values.clone());
    }
    map
}

/// Numeric field from equally sized rows
pub fn numeric_rows(rows: Vec<Vec<f64>>) -> FieldValues {
    FieldValues::Numeric(Array2::from_rows(rows).unwrap())
}

pub fn strings(values: &[&str]) -> FieldValues {
    FieldValues::Strings(values.iter().map(|v| v.to_string()).collect())
}

/// Observation batch shaped like a decoded satellite wind message
///
/// Five records: CLATH is missing for all, CLAT carries the latitudes, SWCM is
/// the wind computation method used by splits.
pub fn create_wind_batch() -> RawFieldMap {
    let mut map = column_map(&[
        ("CLATH", vec![M, M, M, M, M]),
        ("CLAT", vec![10.0, -95.0, 45.5, M, 89.0]),
        ("CLON", vec![100.0, 20.0, -170.0, 5.0, 0.0]),
        ("SWCM", vec![1.0, 3.0, 1.0, 2.0, M]),
        ("PRLC", vec![85000.0, 50000.0, 25000.0, 70000.0, 30000.0]),
        ("YEAR", vec![2020.0, 2021.0, 2020.0, 2020.0, 2023.0]),
        ("MNTH", vec![1.0, 6.0, 2.0, 12.0, 2.0]),
        ("DAYS", vec![1.0, 15.0, 29.0, 31.0, 30.0]),
        ("HOUR", vec![0.0, 12.0, 6.0, 23.0, 0.0]),
        ("MINU", vec![0.0, 30.0, M, 59.0, 0.0]),
    ]);
    map.insert("SAID", strings(&["GOES16", "", "MET11", "GOES16", "NOAA20"]));
    map
}

/// A typical export section for [`create_wind_batch`]
pub fn create_wind_export_config() -> Value {
    serde_json::json!({
        "filters": [
            { "bounding": { "mnemonic": "CLAT", "lowerBound": -90.0, "upperBound": 90.0 } }
        ],
        "splits": {
            "method": {
                "category": {
                    "mnemonic": "SWCM",
                    "map": { "_1": "ir", "_2": "visible", "_3": "water_vapor" }
                }
            }
        },
        "variables": {
            "latitude": { "mnemonic": ["CLATH", "CLAT"] },
            "longitude": { "mnemonic": "CLON" },
            "pressure": {
                "mnemonic": "PRLC",
                "transforms": [ { "scale": 0.01 } ]
            },
            "satellite": { "mnemonic": "SAID" },
            "timestamp": {
                "datetime": {
                    "year": "YEAR",
                    "month": "MNTH",
                    "day": "DAYS",
                    "hour": "HOUR",
                    "minute": "MINU"
                }
            }
        }
    })
}
