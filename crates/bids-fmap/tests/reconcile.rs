//! Tests for field-map reconciliation on disk.

use std::fs;
use std::path::Path;

use bids_fmap::{
    CollisionPolicy, MutationKind, ReconcileOptions, apply_plan, completed_transactions,
    plan_reconciliation, reconcile_directory, sync_manifest, take_snapshot,
};
use bids_model::RenameTransaction;

const MAGNITUDE: &str = r#"{"ImageType": ["ORIGINAL", "PRIMARY", "M", "MAGNITUDE"], "EchoTime": 0.0045}"#;
const PHASE: &str = r#"{"ImageType": ["ORIGINAL", "PRIMARY", "P", "PHASE"], "EchoTime": 0.0045}"#;

fn write_pair(dir: &Path, stem: &str, sidecar: &str) {
    fs::write(dir.join(format!("{stem}.nii.gz")), stem).expect("write image");
    fs::write(dir.join(format!("{stem}.json")), sidecar).expect("write sidecar");
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn canonicalizes_magnitude_and_phase_pair() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_pair(dir.path(), "sub-01_magnitude11", MAGNITUDE);
    write_pair(dir.path(), "sub-01_magnitude12", PHASE);

    let outcome = reconcile_directory(dir.path(), ReconcileOptions::default()).expect("reconcile");
    assert!(outcome.is_clean());
    assert_eq!(
        outcome.log.entries(),
        &[
            RenameTransaction::rename("sub-01_magnitude11.nii.gz", "sub-01_magnitude1.nii.gz"),
            RenameTransaction::rename("sub-01_magnitude12.nii.gz", "sub-01_phase1.nii.gz"),
        ]
    );
    assert_eq!(
        listing(dir.path()),
        vec![
            "sub-01_magnitude1.json",
            "sub-01_magnitude1.nii.gz",
            "sub-01_phase1.json",
            "sub-01_phase1.nii.gz",
        ]
    );
    // Image content travels with the rename.
    assert_eq!(
        fs::read_to_string(dir.path().join("sub-01_phase1.nii.gz")).expect("read"),
        "sub-01_magnitude12"
    );
}

#[test]
fn deletes_numbered_duplicates_and_reconstructions() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_pair(dir.path(), "sub-01_magnitude11", MAGNITUDE);
    write_pair(dir.path(), "sub-01_magnitude13", r#"{"ImageType": ["ORIGINAL"]}"#);
    write_pair(dir.path(), "sub-01_real", "{}");
    write_pair(dir.path(), "sub-01_imaginary", "{}");
    fs::write(dir.path().join("sub-01_magnitude24.json"), "{}").expect("write orphan");

    let outcome = reconcile_directory(dir.path(), ReconcileOptions::default()).expect("reconcile");
    assert_eq!(
        outcome.log.entries(),
        &[
            RenameTransaction::rename("sub-01_magnitude11.nii.gz", "sub-01_magnitude1.nii.gz"),
            RenameTransaction::delete("sub-01_magnitude13.nii.gz"),
            RenameTransaction::delete("sub-01_magnitude24.json"),
            RenameTransaction::delete("sub-01_imaginary.nii.gz"),
            RenameTransaction::delete("sub-01_real.nii.gz"),
        ]
    );
    assert_eq!(
        listing(dir.path()),
        vec!["sub-01_magnitude1.json", "sub-01_magnitude1.nii.gz"]
    );
}

#[test]
fn keep_extra_retains_reconstructions() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_pair(dir.path(), "sub-01_real", "{}");
    write_pair(dir.path(), "sub-01_imaginary", "{}");

    let options = ReconcileOptions {
        keep_extra: true,
        ..ReconcileOptions::default()
    };
    let outcome = reconcile_directory(dir.path(), options).expect("reconcile");
    assert!(outcome.log.is_empty());
    assert_eq!(listing(dir.path()).len(), 4);
}

#[test]
fn second_pass_changes_nothing() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_pair(dir.path(), "sub-01_magnitude11", MAGNITUDE);
    write_pair(dir.path(), "sub-01_magnitude12", PHASE);
    write_pair(dir.path(), "sub-01_magnitude21", MAGNITUDE);
    write_pair(dir.path(), "sub-01_magnitude22", PHASE);
    write_pair(dir.path(), "sub-01_real", "{}");

    reconcile_directory(dir.path(), ReconcileOptions::default()).expect("first pass");
    let after_first = listing(dir.path());
    assert_eq!(
        after_first,
        vec![
            "sub-01_magnitude1.json",
            "sub-01_magnitude1.nii.gz",
            "sub-01_magnitude2.json",
            "sub-01_magnitude2.nii.gz",
            "sub-01_phase1.json",
            "sub-01_phase1.nii.gz",
            "sub-01_phase2.json",
            "sub-01_phase2.nii.gz",
        ]
    );

    let snapshot = take_snapshot(dir.path()).expect("snapshot");
    assert!(plan_reconciliation(&snapshot, ReconcileOptions::default()).is_empty());
    let outcome = reconcile_directory(dir.path(), ReconcileOptions::default()).expect("second pass");
    assert!(outcome.log.is_empty());
    assert_eq!(listing(dir.path()), after_first);
}

#[test]
fn overwrite_replaces_existing_destination() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_pair(dir.path(), "sub-01_magnitude1", MAGNITUDE);
    write_pair(dir.path(), "sub-01_magnitude11", MAGNITUDE);

    let outcome = reconcile_directory(dir.path(), ReconcileOptions::default()).expect("reconcile");
    assert_eq!(outcome.log.len(), 1);
    assert_eq!(
        listing(dir.path()),
        vec!["sub-01_magnitude1.json", "sub-01_magnitude1.nii.gz"]
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("sub-01_magnitude1.nii.gz")).expect("read"),
        "sub-01_magnitude11"
    );
}

#[test]
fn keep_existing_leaves_both_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_pair(dir.path(), "sub-01_magnitude1", MAGNITUDE);
    write_pair(dir.path(), "sub-01_magnitude11", MAGNITUDE);

    let options = ReconcileOptions {
        keep_extra: false,
        collision: CollisionPolicy::KeepExisting,
    };
    let outcome = reconcile_directory(dir.path(), options).expect("reconcile");
    assert!(outcome.log.is_empty());
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(listing(dir.path()).len(), 4);
    assert_eq!(
        fs::read_to_string(dir.path().join("sub-01_magnitude1.nii.gz")).expect("read"),
        "sub-01_magnitude1"
    );
}

#[test]
fn malformed_sidecar_is_a_warning() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_pair(dir.path(), "sub-01_magnitude15", "{ not json");
    write_pair(dir.path(), "sub-01_magnitude21", MAGNITUDE);

    let outcome = reconcile_directory(dir.path(), ReconcileOptions::default()).expect("reconcile");
    assert_eq!(outcome.warnings.len(), 1);
    // Unknown type: not renamed, and `5` is outside the numbered-duplicate range.
    assert_eq!(
        outcome.log.entries(),
        &[RenameTransaction::rename(
            "sub-01_magnitude21.nii.gz",
            "sub-01_magnitude2.nii.gz"
        )]
    );
    assert!(dir.path().join("sub-01_magnitude15.nii.gz").exists());
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    assert!(reconcile_directory(&dir.path().join("fmap"), ReconcileOptions::default()).is_err());
}

#[test]
fn two_provisional_files_for_one_name_keep_the_last() {
    let dir = tempfile::tempdir().expect("temp dir");
    let fmap = dir.path().join("fmap");
    fs::create_dir(&fmap).expect("fmap dir");
    write_pair(&fmap, "sub-01_magnitude11", MAGNITUDE);
    write_pair(&fmap, "sub-01_magnitude1a", MAGNITUDE);
    let manifest = dir.path().join("sub-01_scans.tsv");
    fs::write(
        &manifest,
        "filename\tacq_time\nfmap/sub-01_magnitude11.nii.gz\tfirst\nfmap/sub-01_magnitude1a.nii.gz\tsecond\n",
    )
    .expect("write manifest");

    let outcome = reconcile_directory(&fmap, ReconcileOptions::default()).expect("reconcile");
    assert!(outcome.is_clean());
    assert_eq!(
        outcome.log.entries(),
        &[
            RenameTransaction::rename("sub-01_magnitude11.nii.gz", "sub-01_magnitude1.nii.gz"),
            RenameTransaction::rename("sub-01_magnitude1a.nii.gz", "sub-01_magnitude1.nii.gz"),
        ]
    );
    assert_eq!(
        listing(&fmap),
        vec!["sub-01_magnitude1.json", "sub-01_magnitude1.nii.gz"]
    );
    assert_eq!(
        fs::read_to_string(fmap.join("sub-01_magnitude1.nii.gz")).expect("read"),
        "sub-01_magnitude1a"
    );

    let report = sync_manifest(&manifest, &outcome.log, false).expect("sync");
    assert_eq!((report.renamed, report.dropped), (2, 1));
    assert_eq!(
        fs::read_to_string(&manifest).expect("read manifest"),
        "filename\tacq_time\nfmap/sub-01_magnitude1.nii.gz\tsecond\n"
    );
}

#[cfg(unix)]
#[test]
fn failed_sidecar_move_is_reported_per_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_pair(dir.path(), "sub-01_magnitude11", MAGNITUDE);
    write_pair(dir.path(), "sub-01_magnitude12", PHASE);
    // A directory cannot be replaced by a file.
    fs::create_dir(dir.path().join("sub-01_magnitude1.json")).expect("blocking dir");

    let snapshot = take_snapshot(dir.path()).expect("snapshot");
    let plan = plan_reconciliation(&snapshot, ReconcileOptions::default());
    let outcome = apply_plan(&plan);

    assert!(!outcome.is_clean());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].name, "sub-01_magnitude11.nii.gz");
    assert_eq!(outcome.failures[0].operation, MutationKind::Rename);
    assert_eq!(
        outcome.log.entries(),
        &[RenameTransaction::rename(
            "sub-01_magnitude12.nii.gz",
            "sub-01_phase1.nii.gz"
        )]
    );
    // The image moved before the sidecar rename failed; nothing is rolled back.
    assert!(dir.path().join("sub-01_magnitude1.nii.gz").is_file());
    assert!(dir.path().join("sub-01_magnitude11.json").is_file());

    // The directory state still shows both images under their new names.
    assert_eq!(
        completed_transactions(dir.path(), &plan.transactions()).entries(),
        &[
            RenameTransaction::rename("sub-01_magnitude11.nii.gz", "sub-01_magnitude1.nii.gz"),
            RenameTransaction::rename("sub-01_magnitude12.nii.gz", "sub-01_phase1.nii.gz"),
        ]
    );
}
