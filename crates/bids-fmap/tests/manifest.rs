//! Tests for scan manifest synchronization.

use std::fs;

use bids_fmap::{FmapError, sync_manifest};
use bids_model::{RenameTransaction, TransactionLog};

const MANIFEST: &str = "filename\tacq_time\toperator\n\
anat/sub-01_run-01_T1w.nii.gz\t2024-05-03T10:01:02.500000\t\"JD\"\n\
fmap/sub-01_magnitude11.nii.gz\t2024-05-03T10:20:00\tn/a\n\
fmap/sub-01_magnitude12.nii.gz\t2024-05-03T10:20:00\tn/a\n\
fmap/sub-01_magnitude13.nii.gz\t2024-05-03T10:20:00\tn/a\n\
fmap/sub-01_real.nii.gz\t2024-05-03T10:20:00\tn/a\n";

fn log() -> TransactionLog {
    [
        RenameTransaction::rename("sub-01_magnitude11.nii.gz", "sub-01_magnitude1.nii.gz"),
        RenameTransaction::rename("sub-01_magnitude12.nii.gz", "sub-01_phase1.nii.gz"),
        RenameTransaction::delete("sub-01_magnitude13.nii.gz"),
        RenameTransaction::delete("sub-01_real.nii.gz"),
        RenameTransaction::delete("sub-01_imaginary.nii.gz"),
    ]
    .into_iter()
    .collect()
}

#[test]
fn renames_and_drops_rows() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("sub-01_scans.tsv");
    fs::write(&path, MANIFEST).expect("write manifest");

    let report = sync_manifest(&path, &log(), false).expect("sync");
    assert_eq!(report.renamed, 2);
    assert_eq!(report.dropped, 2);
    assert!(report.written);
    assert_eq!(
        fs::read_to_string(&path).expect("read manifest"),
        "filename\tacq_time\toperator\n\
anat/sub-01_run-01_T1w.nii.gz\t2024-05-03T10:01:02.500000\t\"JD\"\n\
fmap/sub-01_magnitude1.nii.gz\t2024-05-03T10:20:00\tn/a\n\
fmap/sub-01_phase1.nii.gz\t2024-05-03T10:20:00\tn/a\n"
    );
}

#[test]
fn unchanged_manifest_is_not_rewritten() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("sub-01_scans.tsv");
    let contents = "filename\tacq_time\r\nanat/sub-01_T1w.nii.gz\t2024\r\n";
    fs::write(&path, contents).expect("write manifest");

    let report = sync_manifest(&path, &log(), false).expect("sync");
    assert!(!report.written);
    assert_eq!(fs::read_to_string(&path).expect("read"), contents);
}

#[test]
fn dry_run_leaves_file_alone() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("sub-01_scans.tsv");
    fs::write(&path, MANIFEST).expect("write manifest");

    let report = sync_manifest(&path, &log(), true).expect("sync");
    assert_eq!(report.renamed, 2);
    assert!(!report.written);
    assert_eq!(fs::read_to_string(&path).expect("read"), MANIFEST);
}

#[test]
fn rename_onto_listed_file_drops_stale_row() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("sub-01_scans.tsv");
    fs::write(
        &path,
        "filename\tacq_time\nfmap/sub-01_magnitude1.nii.gz\told\nfmap/sub-01_magnitude11.nii.gz\tnew\n",
    )
    .expect("write manifest");
    let log: TransactionLog = vec![RenameTransaction::rename(
        "sub-01_magnitude11.nii.gz",
        "sub-01_magnitude1.nii.gz",
    )]
    .into();

    let report = sync_manifest(&path, &log, false).expect("sync");
    assert_eq!((report.renamed, report.dropped), (1, 1));
    assert_eq!(
        fs::read_to_string(&path).expect("read"),
        "filename\tacq_time\nfmap/sub-01_magnitude1.nii.gz\tnew\n"
    );
}

#[test]
fn unparseable_manifest_is_untouched() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("sub-01_scans.tsv");

    let ragged = "filename\tacq_time\nfmap/sub-01_real.nii.gz\t2024\textra\n";
    fs::write(&path, ragged).expect("write manifest");
    assert!(matches!(
        sync_manifest(&path, &log(), false),
        Err(FmapError::ManifestParse { .. })
    ));
    assert_eq!(fs::read_to_string(&path).expect("read"), ragged);

    let no_filename = "path\tacq_time\nfmap/sub-01_real.nii.gz\t2024\n";
    fs::write(&path, no_filename).expect("write manifest");
    assert!(matches!(
        sync_manifest(&path, &log(), false),
        Err(FmapError::MissingFilenameColumn { .. })
    ));
    assert_eq!(fs::read_to_string(&path).expect("read"), no_filename);
}

#[test]
fn untouched_rows_keep_line_endings() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("sub-01_scans.tsv");
    fs::write(
        &path,
        "filename\tacq_time\r\nanat/sub-01_T1w.nii.gz\t2024\r\n\r\nfmap/sub-01_real.nii.gz\t2024\r\nfmap/sub-01_magnitude11.nii.gz\t2024",
    )
    .expect("write manifest");

    let report = sync_manifest(&path, &log(), false).expect("sync");
    assert_eq!((report.renamed, report.dropped), (1, 1));
    assert_eq!(
        fs::read_to_string(&path).expect("read"),
        "filename\tacq_time\r\nanat/sub-01_T1w.nii.gz\t2024\r\n\r\nfmap/sub-01_magnitude1.nii.gz\t2024"
    );
}
