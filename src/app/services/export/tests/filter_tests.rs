//! Tests for row filters

use super::*;
use crate::Error;
use crate::app::services::export::filters::{
    BoundingFilter, Filter, combined_mask, retained_rows,
};
use crate::schema::ConfNode;
use serde_json::json;

#[test]
fn test_bounding_filter_inclusive_bounds() {
    let data = column_map(&[("CLAT", vec![-90.0, -90.5, 0.0, 90.0, 90.1])]);
    let filter = BoundingFilter::new("CLAT", Some(-90.0), Some(90.0));

    assert_eq!(
        filter.mask(&data, &missing()).unwrap(),
        vec![true, false, true, true, false]
    );
}

#[test]
fn test_bounding_filter_open_ended() {
    let data = column_map(&[("PRLC", vec![100.0, 5000.0, 90000.0])]);

    let lower_only = BoundingFilter::new("PRLC", Some(1000.0), None);
    assert_eq!(
        lower_only.mask(&data, &missing()).unwrap(),
        vec![false, true, true]
    );

    let upper_only = BoundingFilter::new("PRLC", None, Some(1000.0));
    assert_eq!(
        upper_only.mask(&data, &missing()).unwrap(),
        vec![true, false, false]
    );
}

#[test]
fn test_bounding_filter_drops_missing_values() {
    let data = column_map(&[("CLAT", vec![M, 10.0])]);
    let filter = BoundingFilter::new("CLAT", None, None);

    assert_eq!(filter.mask(&data, &missing()).unwrap(), vec![false, true]);
}

#[test]
fn test_bounding_filter_multi_column_rows() {
    let mut data = RawFieldMap::new();
    data.insert(
        "TMBR",
        numeric_rows(vec![
            vec![250.0, M, 260.0],
            vec![250.0, 400.0, M],
            vec![M, M, M],
        ]),
    );
    let filter = BoundingFilter::new("TMBR", Some(100.0), Some(350.0));

    assert_eq!(
        filter.mask(&data, &missing()).unwrap(),
        vec![true, false, false]
    );
}

#[test]
fn test_bounding_filter_errors() {
    let mut data = column_map(&[("CLAT", vec![1.0])]);
    data.insert("SAID", strings(&["GOES16"]));

    assert!(matches!(
        BoundingFilter::new("CLON", None, None).mask(&data, &missing()),
        Err(Error::FieldNotFound { .. })
    ));
    assert!(matches!(
        BoundingFilter::new("SAID", None, None).mask(&data, &missing()),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn test_filters_combine_with_and() {
    let data = column_map(&[
        ("CLAT", vec![10.0, 10.0, 95.0, 10.0]),
        ("PRLC", vec![50000.0, 200.0, 50000.0, M]),
    ]);
    let filters = vec![
        Filter::Bounding(BoundingFilter::new("CLAT", Some(-90.0), Some(90.0))),
        Filter::Bounding(BoundingFilter::new("PRLC", Some(1000.0), None)),
    ];

    let mask = combined_mask(&filters, &data, &missing()).unwrap();
    assert_eq!(mask, vec![true, false, false, false]);
    assert_eq!(retained_rows(&mask), vec![0]);
}

#[test]
fn test_no_filters_keep_every_row() {
    let data = column_map(&[("CLAT", vec![M, 1.0, 2.0])]);
    let mask = combined_mask(&[], &data, &missing()).unwrap();

    assert_eq!(retained_rows(&mask), vec![0, 1, 2]);
}

#[test]
fn test_filter_from_conf() {
    let value = json!({ "bounding": { "mnemonic": "CLAT", "upperBound": 90 } });
    let filter = Filter::from_conf(&ConfNode::new(&value, "export::filters[0]")).unwrap();

    match filter {
        Filter::Bounding(bounding) => {
            assert_eq!(bounding.mnemonic(), "CLAT");
            assert_eq!(bounding.lower_bound(), None);
            assert_eq!(bounding.upper_bound(), Some(90.0));
        }
    }
}

#[test]
fn test_filter_from_conf_errors() {
    let unknown = json!({ "range": { "mnemonic": "CLAT" } });
    match Filter::from_conf(&ConfNode::new(&unknown, "export::filters[0]")) {
        Err(Error::UnknownEntityKind { family, path, found }) => {
            assert_eq!(family, "filter");
            assert_eq!(path, "export::filters[0]");
            assert_eq!(found, "range");
        }
        other => panic!("expected unknown filter, got {:?}", other),
    }

    let no_mnemonic = json!({ "bounding": { "lowerBound": 0 } });
    match Filter::from_conf(&ConfNode::new(&no_mnemonic, "export::filters[0]")) {
        Err(Error::MissingRequiredConfig { path }) => {
            assert_eq!(path, "export::filters[0]::bounding::mnemonic");
        }
        other => panic!("expected missing mnemonic, got {:?}", other),
    }
}
