//! Tests for frame assembly and result set padding


// Test helper functions and fixtures
use crate::app::services::result_set::{DataField, DataFrame, FieldData, ResultSet};
use crate::constants::MISSING_VALUE;

pub const M: f64 = MISSING_VALUE;

/// Field repeated once per level with the given counts
pub fn repeated_numeric(name: &str, values: Vec<f64>, seq_counts: Vec<Vec<usize>>) -> DataField {
    let seq_path = (1..=seq_counts.len()).collect();
    DataField::repeated(name, FieldData::Numeric(values), seq_path, seq_counts)
}

pub fn frame(fields: Vec<DataField>) -> DataFrame {
    let mut frame = DataFrame::new();
    for field in fields {
        frame.add_field(field).unwrap();
    }
    frame
}

pub fn result_set(names: &[&str]) -> ResultSet {
    ResultSet::new(names.iter().map(|n| n.to_string()).collect())
}

/// Three records of a brightness temperature field repeated over 2, 0 and 3 channels
pub fn create_channel_result_set() -> ResultSet {
    let mut set = result_set(&["CLAT", "TMBR"]);
    set.push_frame(frame(vec![
        DataField::scalar("CLAT", 10.0),
        repeated_numeric("TMBR", vec![250.0, 251.0], vec![vec![2]]),
    ]))
    .unwrap();
    set.push_frame(frame(vec![
        DataField::scalar("CLAT", 20.0),
        repeated_numeric("TMBR", vec![], vec![vec![0]]),
    ]))
    .unwrap();
    set.push_frame(frame(vec![
        DataField::scalar("CLAT", 30.0),
        repeated_numeric("TMBR", vec![260.0, 261.0, 262.0], vec![vec![3]]),
    ]))
    .unwrap();
    set
}
