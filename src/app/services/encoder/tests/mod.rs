//! Tests for output encoding
//!
//! Unit tests for artifacts, the output description, the in-memory store and
//! the batch encoder.


// Test helper functions and fixtures
use crate::app::models::{Array2, FieldValues, MissingValue, RawFieldMap};
use crate::app::services::encoder::{DataObject, Dimension};
use crate::app::services::export::Export;
use crate::constants::MISSING_VALUE;
use serde_json::{Value, json};

pub const M: f64 = MISSING_VALUE;

pub fn missing() -> MissingValue {
    MissingValue::default()
}

pub fn location(size: usize) -> Dimension {
    Dimension::new("Location", size)
}

pub fn numeric_object(rows: Vec<Vec<f64>>) -> DataObject {
    DataObject::numeric(Array2::from_rows(rows).unwrap())
}

pub fn string_object(values: &[&str]) -> DataObject {
    DataObject::strings(values.iter().map(|v| v.to_string()).collect())
}

/// Four radiance records over three channels, two scan methods
pub fn create_radiance_batch() -> RawFieldMap {
    let mut map = RawFieldMap::new();
    map.insert_column("CLAT", vec![10.0, 20.0, 95.0, 40.0]);
    map.insert_column("CLON", vec![1.0, 2.0, 3.0, 4.0]);
    map.insert_column("SCAN", vec![1.0, 2.0, 1.0, 1.0]);
    map.insert(
        "TMBR",
        FieldValues::Numeric(
            Array2::from_rows(vec![
                vec![250.0, 251.0, 252.0],
                vec![260.0, M, 262.0],
                vec![270.0, 271.0, 272.0],
                vec![280.0, 281.0, M],
            ])
            .unwrap(),
        ),
    );
    map.insert(
        "SAID",
        FieldValues::Strings(vec![
            "NOAA20".to_string(),
            "NOAA20".to_string(),
            "METOPB".to_string(),
            String::new(),
        ]),
    );
    map
}

pub fn create_radiance_export_config() -> Value {
    json!({
        "filters": [
            { "bounding": { "mnemonic": "CLAT", "lowerBound": -90, "upperBound": 90 } }
        ],
        "splits": {
            "scan": { "category": { "mnemonic": "SCAN", "map": { "_1": "forward", "_2": "backward" } } }
        },
        "variables": {
            "latitude": { "mnemonic": "CLAT" },
            "longitude": { "mnemonic": "CLON" },
            "brightnessTemperature": { "mnemonic": "TMBR", "transforms": [ { "offset": -273.15 } ] },
            "satelliteId": { "mnemonic": "SAID" }
        }
    })
}

pub fn create_radiance_output_config() -> Value {
    json!({
        "dimensions": [ { "name": "Channel", "source": "variables/brightnessTemperature" } ],
        "variables": [
            { "name": "MetaData/latitude", "source": "variables/latitude", "units": "degrees_north" },
            { "name": "MetaData/longitude", "source": "longitude" },
            { "name": "MetaData/satelliteId", "source": "variables/satelliteId" },
            {
                "name": "ObsValue/brightnessTemperature",
                "source": "variables/brightnessTemperature",
                "dimensions": ["Location", "Channel"],
                "fillValue": -999.0,
                "chunks": [1000, 3],
                "longName": "brightness temperature",
                "units": "K"
            }
        ]
    })
}

pub fn create_radiance_export() -> Export {
    Export::from_value(&create_radiance_export_config()).unwrap()
}
