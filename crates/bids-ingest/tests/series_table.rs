//! Tests for series table loading.

use std::fs;
use std::path::{Path, PathBuf};

use bids_ingest::{IngestError, load_series_table};
use bids_model::{AcquisitionKind, Direction, ImageTypeCode};

fn write_table(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("series.tsv");
    fs::write(&path, contents).expect("write table");
    path
}

#[test]
fn loads_full_table_sorted_by_series_number() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_table(
        dir.path(),
        "series_number\tdescription\tdirection\tacquisition_kind\ttemporal_length\tis_reference_volume\timage_type\n\
         12\tBOLD_REST1_PA\tPA\tfunc\t300\tfalse\t\n\
         2\tT1_MPR\t\tanat\t1\tfalse\tM\n\
         11\tBOLD_REST1_PA_SBRef\tPA\tfunc\t1\ttrue\t\n",
    );
    let descriptors = load_series_table(&path).expect("load");
    let numbers: Vec<u32> = descriptors.iter().map(|d| d.series_number).collect();
    assert_eq!(numbers, vec![2, 11, 12]);

    let t1 = &descriptors[0];
    assert_eq!(t1.acquisition_kind, AcquisitionKind::Anat);
    assert_eq!(t1.direction, None);
    assert_eq!(t1.vendor_image_type_code, Some(ImageTypeCode::Magnitude));

    let bold = &descriptors[2];
    assert_eq!(bold.direction, Some(Direction::Pa));
    assert_eq!(bold.temporal_length, 300);
    assert!(!bold.is_reference_volume);
    assert!(descriptors[1].is_reference_volume);
}

#[test]
fn infers_missing_columns_from_description() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_table(
        dir.path(),
        "series_number\tdescription\n5\tDWI_AP_SBRef\n3\tLocalizer\n",
    );
    let descriptors = load_series_table(&path).expect("load");
    assert_eq!(descriptors.len(), 2);

    let localizer = &descriptors[0];
    assert_eq!(localizer.direction, None);
    assert_eq!(localizer.acquisition_kind, AcquisitionKind::Other);
    assert_eq!(localizer.temporal_length, 1);
    assert!(!localizer.is_reference_volume);

    let sbref = &descriptors[1];
    assert_eq!(sbref.direction, Some(Direction::Ap));
    assert!(sbref.is_reference_volume);
}

#[test]
fn equal_series_numbers_keep_table_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_table(
        dir.path(),
        "series_number\tdescription\n4\tsecond_echo\n4\tfirst_listed_later\n1\tT1_MPR\n",
    );
    let descriptors = load_series_table(&path).expect("load");
    let names: Vec<&str> = descriptors.iter().map(|d| d.description.as_str()).collect();
    assert_eq!(names, vec!["T1_MPR", "second_echo", "first_listed_later"]);
}

#[test]
fn reports_missing_column_and_bad_values() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_table(dir.path(), "number\tdescription\n1\tT1\n");
    assert!(matches!(
        load_series_table(&path),
        Err(IngestError::MissingColumn { column, .. }) if column == "series_number"
    ));

    let path = write_table(
        dir.path(),
        "series_number\tdescription\ttemporal_length\n1\tT1\tmany\n",
    );
    match load_series_table(&path) {
        Err(IngestError::InvalidValue { field, value, line, .. }) => {
            assert_eq!(field, "temporal_length");
            assert_eq!(value, "many");
            assert_eq!(line, 2);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let path = write_table(dir.path(), "series_number\tdescription\tdirection\n1\tT1\tLR\n");
    assert!(matches!(
        load_series_table(&path),
        Err(IngestError::InvalidValue { field, .. }) if field == "direction"
    ));

    assert!(matches!(
        load_series_table(&dir.path().join("absent.tsv")),
        Err(IngestError::FileNotFound { .. })
    ));
}
