//! Tests for category splits

use super::*;
use crate::Error;
use crate::app::services::export::splits::{CategorySplit, Split};
use crate::schema::ConfNode;
use serde_json::json;
use std::collections::BTreeMap;

fn name_map(entries: &[(i64, &str)]) -> BTreeMap<i64, String> {
    entries
        .iter()
        .map(|(code, name)| (*code, name.to_string()))
        .collect()
}

#[test]
fn test_category_split_mapped_and_unmapped_names() {
    let data = column_map(&[("SWCM", vec![1.0, 3.0, 1.0, 2.0])]);
    let split = CategorySplit::new("SWCM", name_map(&[(1, "ir"), (2, "visible")])).unwrap();

    let partitions = split.partition("method", &data, &missing()).unwrap();

    assert_eq!(partitions.len(), 3);
    assert_eq!(partitions["ir"], vec![0, 2]);
    assert_eq!(partitions["visible"], vec![3]);
    assert_eq!(partitions["3"], vec![1]);
}

#[test]
fn test_category_split_rounds_codes() {
    let data = column_map(&[("SWCM", vec![0.9999999, 1.0000001])]);
    let split = CategorySplit::new("SWCM", name_map(&[(1, "ir")])).unwrap();

    let partitions = split.partition("method", &data, &missing()).unwrap();
    assert_eq!(partitions["ir"], vec![0, 1]);
}

#[test]
fn test_category_split_missing_partition() {
    let data = column_map(&[("SWCM", vec![1.0, M])]);
    let split = CategorySplit::new("SWCM", BTreeMap::new()).unwrap();

    let partitions = split.partition("method", &data, &missing()).unwrap();
    assert_eq!(partitions["1"], vec![0]);
    assert_eq!(partitions["missing"], vec![1]);
}

#[test]
fn test_every_row_lands_in_one_partition() {
    let data = create_wind_batch();
    let split = CategorySplit::new("SWCM", name_map(&[(1, "ir")])).unwrap();

    let partitions = split.partition("method", &data, &missing()).unwrap();
    let mut rows: Vec<usize> = partitions.values().flatten().copied().collect();
    rows.sort_unstable();

    assert_eq!(rows, (0..data.row_count()).collect::<Vec<_>>());
}

#[test]
fn test_duplicate_mapped_names_rejected() {
    match CategorySplit::new("SWCM", name_map(&[(1, "ir"), (2, "ir")])) {
        Err(Error::AmbiguousSplitName { name, .. }) => assert_eq!(name, "ir"),
        other => panic!("expected ambiguous name, got {:?}", other),
    }
}

#[test]
fn test_generated_name_colliding_with_mapped_name() {
    // Code 1 is mapped to "2" while code 2 falls back to its own string "2"
    let data = column_map(&[("SWCM", vec![1.0, 2.0])]);
    let split = CategorySplit::new("SWCM", name_map(&[(1, "2")])).unwrap();

    match split.partition("method", &data, &missing()) {
        Err(Error::AmbiguousSplitName { split, name }) => {
            assert_eq!(split, "method");
            assert_eq!(name, "2");
        }
        other => panic!("expected ambiguous name, got {:?}", other),
    }
}

#[test]
fn test_mapped_name_colliding_with_missing_partition() {
    let data = column_map(&[("SWCM", vec![7.0, M])]);
    let split = CategorySplit::new("SWCM", name_map(&[(7, "missing")])).unwrap();

    assert!(matches!(
        split.partition("method", &data, &missing()),
        Err(Error::AmbiguousSplitName { .. })
    ));
}

#[test]
fn test_split_field_errors() {
    let mut data = RawFieldMap::new();
    data.insert("SAID", strings(&["a"]));
    data.insert("EMPTY", FieldValues::Numeric(Array2::new(1, 0, vec![]).unwrap()));

    let string_split = CategorySplit::new("SAID", BTreeMap::new()).unwrap();
    assert!(matches!(
        string_split.partition("s", &data, &missing()),
        Err(Error::TypeMismatch { .. })
    ));

    let absent_split = CategorySplit::new("SWCM", BTreeMap::new()).unwrap();
    assert!(matches!(
        absent_split.partition("s", &data, &missing()),
        Err(Error::FieldNotFound { .. })
    ));

    let empty_split = CategorySplit::new("EMPTY", BTreeMap::new()).unwrap();
    assert!(matches!(
        empty_split.partition("s", &data, &missing()),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_split_from_conf_accepts_both_key_forms() {
    let value = json!({
        "category": { "mnemonic": "SWCM", "map": { "_1": "ir", "2": "visible" } }
    });
    let split = Split::from_conf(&ConfNode::new(&value, "export::splits::method")).unwrap();

    assert_eq!(split.mnemonic(), "SWCM");
    match split {
        Split::Category(category) => {
            assert_eq!(category.name_map(), &name_map(&[(1, "ir"), (2, "visible")]));
            assert_eq!(category.partition_name(5), "5");
        }
    }
}

#[test]
fn test_split_from_conf_errors() {
    let bad_key = json!({ "category": { "mnemonic": "SWCM", "map": { "ir": "x" } } });
    assert!(matches!(
        Split::from_conf(&ConfNode::new(&bad_key, "export::splits::method")),
        Err(Error::InvalidConfigValue { .. })
    ));

    let unknown = json!({ "range": { "mnemonic": "SWCM" } });
    assert!(matches!(
        Split::from_conf(&ConfNode::new(&unknown, "export::splits::method")),
        Err(Error::UnknownEntityKind { .. })
    ));

    let duplicate = json!({ "category": { "mnemonic": "SWCM", "map": { "_1": "ir", "_2": "ir" } } });
    assert!(matches!(
        Split::from_conf(&ConfNode::new(&duplicate, "export::splits::method")),
        Err(Error::AmbiguousSplitName { .. })
    ));
}
