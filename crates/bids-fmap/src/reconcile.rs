//! Field-map reconciliation.
//!
//! A pass has three phases:
//!
//! 1. **Snapshot** - list the directory once and read provisional sidecars
//!    ([`take_snapshot`]).
//! 2. **Plan** - compute every rename and deletion from the snapshot alone
//!    ([`plan_reconciliation`]).
//! 3. **Apply** - perform the planned mutations, recording the ones that
//!    succeed ([`apply_plan`]).
//!
//! Canonical names never look provisional, so a second pass over a reconciled
//! directory plans nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use bids_model::{FieldMapFile, FieldMapImageType, RenameTransaction, TransactionLog};

use crate::error::Result;
use crate::snapshot::{FieldMapSnapshot, SIDECAR_EXTENSION, parse_provisional_stem, take_snapshot};

/// Numbered magnitude duplicates left behind by the converter.
static NUMBERED_DUPLICATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"magnitude[12][1-4]$").expect("Invalid numbered duplicate regex")
});

/// What to do when a rename destination already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Delete the existing destination first (last write wins).
    #[default]
    Overwrite,
    /// Leave both files in place and skip the rename.
    KeepExisting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Retain `*_real.*` and `*_imaginary.*` reconstructions.
    pub keep_extra: bool,
    pub collision: CollisionPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    NumberedDuplicate,
    ExtraReconstruction,
}

impl fmt::Display for DeleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteReason::NumberedDuplicate => f.write_str("numbered duplicate"),
            DeleteReason::ExtraReconstruction => f.write_str("real/imaginary reconstruction"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMapAction {
    Rename {
        file: FieldMapFile,
        new_stem: String,
        /// Files occupying the destination, removed before the rename.
        replaces: Option<FieldMapFile>,
    },
    Delete {
        file: FieldMapFile,
        reason: DeleteReason,
    },
}

impl FieldMapAction {
    pub fn file(&self) -> &FieldMapFile {
        match self {
            FieldMapAction::Rename { file, .. } | FieldMapAction::Delete { file, .. } => file,
        }
    }

    /// The log entry this action produces once applied.
    pub fn transaction(&self) -> RenameTransaction {
        match self {
            FieldMapAction::Rename { file, new_stem, .. } => {
                RenameTransaction::rename(file.on_disk_name(), renamed(file, new_stem).on_disk_name())
            }
            FieldMapAction::Delete { file, .. } => RenameTransaction::delete(file.on_disk_name()),
        }
    }
}

/// A provisional file left alone because its destination was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRename {
    pub name: String,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub dir: PathBuf,
    pub actions: Vec<FieldMapAction>,
    pub skipped: Vec<SkippedRename>,
    pub warnings: Vec<String>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The transaction log a fully successful apply would produce.
    pub fn transactions(&self) -> Vec<RenameTransaction> {
        self.actions.iter().map(FieldMapAction::transaction).collect()
    }
}

/// Computes the actions for a snapshot without touching the filesystem.
///
/// Order: renames in snapshot order, then numbered-duplicate deletions, then
/// real/imaginary deletions.
pub fn plan_reconciliation(snapshot: &FieldMapSnapshot, options: ReconcileOptions) -> ReconcilePlan {
    let mut occupied: BTreeMap<String, FieldMapFile> = snapshot
        .files
        .iter()
        .map(|file| (file.stem.clone(), file.clone()))
        .collect();
    let mut handled: BTreeSet<String> = BTreeSet::new();
    let mut actions = Vec::new();
    let mut skipped = Vec::new();

    for file in &snapshot.files {
        let Some(provisional) = parse_provisional_stem(&file.stem) else {
            continue;
        };
        if file.sidecar_name.is_none() {
            continue;
        }
        let kind = match file.image_type {
            FieldMapImageType::Phase => "phase",
            FieldMapImageType::Magnitude => "magnitude",
            FieldMapImageType::Unknown => continue,
        };
        let new_stem = format!("{}{kind}{}", provisional.prefix, provisional.echo);
        let replaces = occupied.get(&new_stem).cloned();
        if replaces.is_some() && options.collision == CollisionPolicy::KeepExisting {
            tracing::warn!(
                file = file.on_disk_name(),
                destination = %new_stem,
                "destination exists; keeping provisional file"
            );
            skipped.push(SkippedRename {
                name: file.on_disk_name().to_string(),
                destination: new_stem,
            });
            handled.insert(file.stem.clone());
            continue;
        }
        occupied.remove(&file.stem);
        occupied.insert(new_stem.clone(), renamed(file, &new_stem));
        handled.insert(file.stem.clone());
        actions.push(FieldMapAction::Rename {
            file: file.clone(),
            new_stem,
            replaces,
        });
    }

    for file in &snapshot.files {
        if handled.contains(&file.stem) || !NUMBERED_DUPLICATE.is_match(&file.stem) {
            continue;
        }
        handled.insert(file.stem.clone());
        actions.push(FieldMapAction::Delete {
            file: file.clone(),
            reason: DeleteReason::NumberedDuplicate,
        });
    }

    if !options.keep_extra {
        for file in &snapshot.files {
            if handled.contains(&file.stem) || !is_extra_reconstruction(&file.stem) {
                continue;
            }
            actions.push(FieldMapAction::Delete {
                file: file.clone(),
                reason: DeleteReason::ExtraReconstruction,
            });
        }
    }

    ReconcilePlan {
        dir: snapshot.dir.clone(),
        actions,
        skipped,
        warnings: snapshot.warnings.clone(),
    }
}

fn is_extra_reconstruction(stem: &str) -> bool {
    stem.ends_with("_real") || stem.ends_with("_imaginary")
}

fn renamed(file: &FieldMapFile, new_stem: &str) -> FieldMapFile {
    FieldMapFile {
        stem: new_stem.to_string(),
        image_name: file
            .image_name
            .as_ref()
            .map(|_| format!("{new_stem}{}", file.image_extension())),
        sidecar_name: file
            .sidecar_name
            .as_ref()
            .map(|_| format!("{new_stem}{SIDECAR_EXTENSION}")),
        image_type: file.image_type,
        echo_number: file.echo_number,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Rename,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Rename => f.write_str("rename"),
            MutationKind::Delete => f.write_str("delete"),
        }
    }
}

/// A mutation that could not be completed. No rollback is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationFailure {
    pub name: String,
    pub operation: MutationKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub log: TransactionLog,
    pub failures: Vec<MutationFailure>,
    pub skipped: Vec<SkippedRename>,
    pub warnings: Vec<String>,
}

impl ReconcileOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Performs the planned mutations once each, in plan order.
pub fn apply_plan(plan: &ReconcilePlan) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome {
        skipped: plan.skipped.clone(),
        warnings: plan.warnings.clone(),
        ..ReconcileOutcome::default()
    };

    for action in &plan.actions {
        let (operation, result) = match action {
            FieldMapAction::Rename {
                file,
                new_stem,
                replaces,
            } => (
                MutationKind::Rename,
                apply_rename(&plan.dir, file, new_stem, replaces.as_ref()),
            ),
            FieldMapAction::Delete { file, .. } => {
                (MutationKind::Delete, remove_file_group(&plan.dir, file))
            }
        };
        let name = action.file().on_disk_name().to_string();
        match result {
            Ok(()) => {
                let transaction = action.transaction();
                tracing::info!(%transaction, "field-map {operation}");
                if let Err(error) = outcome.log.record(transaction) {
                    tracing::warn!(%error, "transaction not recorded");
                }
            }
            Err(error) => {
                tracing::error!(file = %name, %operation, %error, "field-map mutation failed");
                outcome.failures.push(MutationFailure {
                    name,
                    operation,
                    message: error.to_string(),
                });
            }
        }
    }
    outcome
}

/// Snapshot, plan and apply for one field-map directory.
pub fn reconcile_directory(dir: &Path, options: ReconcileOptions) -> Result<ReconcileOutcome> {
    let snapshot = take_snapshot(dir)?;
    let plan = plan_reconciliation(&snapshot, options);
    let outcome = apply_plan(&plan);
    log_directory_contents(dir);
    Ok(outcome)
}

fn apply_rename(
    dir: &Path,
    file: &FieldMapFile,
    new_stem: &str,
    replaces: Option<&FieldMapFile>,
) -> std::io::Result<()> {
    if let Some(existing) = replaces {
        remove_file_group(dir, existing)?;
    }
    let target = renamed(file, new_stem);
    let pairs = [
        (&file.image_name, &target.image_name),
        (&file.sidecar_name, &target.sidecar_name),
    ];
    for (from, to) in pairs {
        if let (Some(from), Some(to)) = (from, to) {
            std::fs::rename(dir.join(from), dir.join(to))?;
        }
    }
    Ok(())
}

fn remove_file_group(dir: &Path, file: &FieldMapFile) -> std::io::Result<()> {
    for name in [&file.image_name, &file.sidecar_name].into_iter().flatten() {
        match std::fs::remove_file(dir.join(name)) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => return Err(error),
        }
    }
    Ok(())
}

/// Logs the sorted directory listing at debug level.
pub fn log_directory_contents(dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    tracing::debug!(dir = %dir.display(), contents = ?names, "final field-map contents");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(stem: &str, image_type: FieldMapImageType) -> FieldMapFile {
        FieldMapFile {
            stem: stem.to_string(),
            image_name: Some(format!("{stem}.nii.gz")),
            sidecar_name: Some(format!("{stem}.json")),
            image_type,
            echo_number: parse_provisional_stem(stem).map(|p| p.echo),
        }
    }

    fn snapshot(files: Vec<FieldMapFile>) -> FieldMapSnapshot {
        FieldMapSnapshot {
            dir: PathBuf::from("fmap"),
            names: Vec::new(),
            files,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn plans_renames_before_deletions() {
        let snapshot = snapshot(vec![
            file("sub-01_imaginary", FieldMapImageType::Unknown),
            file("sub-01_magnitude11", FieldMapImageType::Magnitude),
            file("sub-01_magnitude12", FieldMapImageType::Phase),
            file("sub-01_magnitude13", FieldMapImageType::Unknown),
            file("sub-01_real", FieldMapImageType::Unknown),
        ]);
        let plan = plan_reconciliation(&snapshot, ReconcileOptions::default());
        assert_eq!(
            plan.transactions(),
            vec![
                RenameTransaction::rename("sub-01_magnitude11.nii.gz", "sub-01_magnitude1.nii.gz"),
                RenameTransaction::rename("sub-01_magnitude12.nii.gz", "sub-01_phase1.nii.gz"),
                RenameTransaction::delete("sub-01_magnitude13.nii.gz"),
                RenameTransaction::delete("sub-01_imaginary.nii.gz"),
                RenameTransaction::delete("sub-01_real.nii.gz"),
            ]
        );
    }

    #[test]
    fn keep_existing_protects_provisional_file() {
        let snapshot = snapshot(vec![
            file("sub-01_magnitude1", FieldMapImageType::Magnitude),
            file("sub-01_magnitude11", FieldMapImageType::Magnitude),
        ]);
        let options = ReconcileOptions {
            keep_extra: false,
            collision: CollisionPolicy::KeepExisting,
        };
        let plan = plan_reconciliation(&snapshot, options);
        assert!(plan.is_empty());
        assert_eq!(
            plan.skipped,
            vec![SkippedRename {
                name: "sub-01_magnitude11.nii.gz".to_string(),
                destination: "sub-01_magnitude1".to_string(),
            }]
        );

        let plan = plan_reconciliation(&snapshot, ReconcileOptions::default());
        match plan.actions.as_slice() {
            [FieldMapAction::Rename { replaces: Some(existing), .. }] => {
                assert_eq!(existing.stem, "sub-01_magnitude1");
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }
}
