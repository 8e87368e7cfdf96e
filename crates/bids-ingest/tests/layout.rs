//! Tests for study layout discovery.

use std::fs;

use bids_ingest::{IngestError, StudyLayout};

#[test]
fn lists_subjects_and_sessions_in_order() {
    let study = tempfile::tempdir().expect("temp dir");
    let rawdata = study.path().join("bids").join("rawdata");
    fs::create_dir_all(rawdata.join("sub-02").join("fmap")).expect("mkdir");
    fs::create_dir_all(rawdata.join("sub-01").join("ses-2")).expect("mkdir");
    fs::create_dir_all(rawdata.join("sub-01").join("ses-1")).expect("mkdir");
    fs::create_dir_all(rawdata.join("derivatives")).expect("mkdir");
    fs::write(rawdata.join("participants.tsv"), "participant_id\n").expect("write");

    let units = StudyLayout::new(study.path()).units().expect("units");
    let labels: Vec<String> = units.iter().map(|unit| unit.label()).collect();
    assert_eq!(labels, vec!["sub-01/ses-1", "sub-01/ses-2", "sub-02"]);

    assert_eq!(
        units[0].scans_tsv(),
        rawdata.join("sub-01").join("ses-1").join("sub-01_ses-1_scans.tsv")
    );
    assert_eq!(units[2].fmap_dir(), rawdata.join("sub-02").join("fmap"));
    assert_eq!(units[2].scans_tsv(), rawdata.join("sub-02").join("sub-02_scans.tsv"));
}

#[test]
fn skips_invalid_subject_labels() {
    let root = tempfile::tempdir().expect("temp dir");
    fs::create_dir_all(root.path().join("sub-01")).expect("mkdir");
    fs::create_dir_all(root.path().join("sub-bad.label")).expect("mkdir");

    let layout = StudyLayout::new("unused").with_bids_root(root.path());
    let units = layout.units().expect("units");
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].subject.as_str(), "01");
}

#[test]
fn reports_missing_rawdata_and_empty_roots() {
    let study = tempfile::tempdir().expect("temp dir");
    assert!(matches!(
        StudyLayout::new(study.path()).units(),
        Err(IngestError::RawdataNotFound { .. })
    ));

    let rawdata = study.path().join("bids").join("rawdata");
    fs::create_dir_all(rawdata.join("code")).expect("mkdir");
    assert!(matches!(
        StudyLayout::new(study.path()).units(),
        Err(IngestError::NoSubjects { .. })
    ));
}

#[cfg(unix)]
#[test]
fn unreadable_subject_does_not_stop_discovery() {
    use std::os::unix::fs::PermissionsExt;

    let root = tempfile::tempdir().expect("temp dir");
    fs::create_dir_all(root.path().join("sub-01").join("ses-1")).expect("mkdir");
    let locked = root.path().join("sub-02");
    fs::create_dir_all(&locked).expect("mkdir");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("chmod");

    // Privileged users can still list the directory; nothing to exercise then.
    let readable = fs::read_dir(&locked).is_ok();
    let units = StudyLayout::new("unused").with_bids_root(root.path()).units();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("chmod back");
    if readable {
        return;
    }

    let labels: Vec<String> = units.expect("units").iter().map(|unit| unit.label()).collect();
    assert_eq!(labels, vec!["sub-01/ses-1"]);
}
