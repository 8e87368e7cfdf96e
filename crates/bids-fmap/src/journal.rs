//! Pending-transaction journal.
//!
//! Field-map files change before the scans manifest is synchronized. In
//! between, the manifest names files that were already renamed or removed. A
//! crash in that window, or a rename that moved the image but not its
//! sidecar, would otherwise leave the manifest stale: the next pass finds
//! nothing to rename and so produces an empty log.
//!
//! Before anything in `fmap/` changes, the planned transactions are written
//! next to the manifest ([`write_journal`]). Once the manifest has been
//! synchronized the journal is removed. A journal found at the start of a run
//! is replayed by [`recover_manifest`]: every planned transaction whose effect
//! is visible on disk is applied to the manifest.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use bids_model::{RenameTransaction, TransactionLog};

use crate::error::{FmapError, Result};
use crate::manifest::{SyncReport, sync_manifest, write_atomic};

pub const JOURNAL_SUFFIX: &str = ".fmap-journal.json";

#[derive(Debug, Serialize, Deserialize)]
struct Journal {
    pending: Vec<RenameTransaction>,
}

/// `.sub-01_ses-1_scans.fmap-journal.json` beside `sub-01_ses-1_scans.tsv`.
/// Hidden so BIDS tooling ignores it.
pub fn journal_path(manifest: &Path) -> PathBuf {
    let stem = manifest
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    manifest.with_file_name(format!(".{stem}{JOURNAL_SUFFIX}"))
}

pub fn write_journal(path: &Path, pending: &[RenameTransaction]) -> Result<()> {
    let journal = Journal {
        pending: pending.to_vec(),
    };
    let contents = serde_json::to_string_pretty(&journal).map_err(|source| FmapError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, contents.as_bytes())
}

/// Returns `None` when no journal exists.
pub fn read_journal(path: &Path) -> Result<Option<Vec<RenameTransaction>>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(FmapError::read(path, error)),
    };
    let journal: Journal = serde_json::from_str(&contents).map_err(|source| FmapError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(journal.pending))
}

pub fn remove_journal(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(error) => Err(FmapError::write(path, error)),
    }
}

/// Planned transactions whose effect is visible in `fmap_dir`: the old name is
/// gone and, for a rename, the new name exists.
pub fn completed_transactions(fmap_dir: &Path, planned: &[RenameTransaction]) -> TransactionLog {
    planned
        .iter()
        .filter(|transaction| {
            !fmap_dir.join(&transaction.old_name).exists()
                && transaction
                    .new_name
                    .as_ref()
                    .is_none_or(|new_name| fmap_dir.join(new_name).exists())
        })
        .cloned()
        .collect()
}

/// Completes an interrupted run. Returns `None` when there is no journal.
///
/// The journal is kept when the manifest cannot be synchronized, and in a dry
/// run.
pub fn recover_manifest(fmap_dir: &Path, manifest: &Path, dry_run: bool) -> Result<Option<SyncReport>> {
    let journal = journal_path(manifest);
    let Some(pending) = read_journal(&journal)? else {
        return Ok(None);
    };
    let completed = completed_transactions(fmap_dir, &pending);
    tracing::warn!(
        journal = %journal.display(),
        pending = pending.len(),
        completed = completed.len(),
        "replaying journal of an interrupted run"
    );
    let report = sync_manifest(manifest, &completed, dry_run)?;
    if !dry_run {
        remove_journal(&journal)?;
    }
    Ok(Some(report))
}
