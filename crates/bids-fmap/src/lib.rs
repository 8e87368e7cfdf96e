//! Post-conversion maintenance of BIDS field-map directories.
//!
//! - [`reconcile`]: canonicalizes provisional magnitude/phase names and removes
//!   numbered duplicates and real/imaginary reconstructions.
//! - [`manifest`]: mirrors the resulting transaction log into the scans TSV.
//! - [`journal`]: pending transactions that let an interrupted run finish
//!   synchronizing the manifest.
//! - [`intended_for`]: restricts each field map's `IntendedFor` to scans of
//!   the same phase-encoding direction.

pub mod error;
pub mod intended_for;
pub mod journal;
pub mod manifest;
pub mod reconcile;
pub mod sidecar;
pub mod snapshot;

pub use error::{FmapError, Result};
pub use intended_for::{RepairReport, RepairedSidecar, direction_token, repair_intended_for};
pub use journal::{
    JOURNAL_SUFFIX, completed_transactions, journal_path, read_journal, recover_manifest,
    remove_journal, write_journal,
};
pub use manifest::{FMAP_PREFIX, RowChanges, ScanManifest, SyncReport, sync_manifest};
pub use reconcile::{
    CollisionPolicy, DeleteReason, FieldMapAction, MutationFailure, MutationKind,
    ReconcileOptions, ReconcileOutcome, ReconcilePlan, SkippedRename, apply_plan,
    log_directory_contents, plan_reconciliation, reconcile_directory,
};
pub use snapshot::{FieldMapSnapshot, take_snapshot};
