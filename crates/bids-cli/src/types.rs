use std::path::PathBuf;

use bids_fmap::{MutationFailure, ReconcileOptions, RepairReport, SkippedRename, SyncReport};
use bids_model::{OutputAssignment, RenameTransaction};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileRunOptions {
    pub reconcile: ReconcileOptions,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct ClassifyResult {
    pub rule_set: String,
    pub series_table: PathBuf,
    pub series_read: usize,
    pub assignment: OutputAssignment,
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ManifestStatus {
    /// No transactions, nothing to sync.
    Untouched,
    Synced(SyncReport),
    Missing { path: PathBuf },
    Failed { path: PathBuf, message: String },
}

#[derive(Debug)]
pub struct UnitReconcileReport {
    pub unit: String,
    pub fmap_dir: PathBuf,
    /// Set when the unit has no field-map directory.
    pub skipped: Option<String>,
    /// Error that stopped the unit before any mutation.
    pub error: Option<String>,
    /// Applied transactions, or the planned ones in a dry run.
    pub transactions: Vec<RenameTransaction>,
    pub failures: Vec<MutationFailure>,
    pub collisions: Vec<SkippedRename>,
    pub warnings: Vec<String>,
    pub manifest: ManifestStatus,
    /// Manifest sync replayed from the journal of an interrupted run.
    pub recovered: Option<SyncReport>,
}

impl UnitReconcileReport {
    pub fn new(unit: String, fmap_dir: PathBuf) -> Self {
        Self {
            unit,
            fmap_dir,
            skipped: None,
            error: None,
            transactions: Vec::new(),
            failures: Vec::new(),
            collisions: Vec::new(),
            warnings: Vec::new(),
            manifest: ManifestStatus::Untouched,
            recovered: None,
        }
    }

    pub fn renamed(&self) -> usize {
        self.transactions.iter().filter(|t| !t.is_deletion()).count()
    }

    pub fn deleted(&self) -> usize {
        self.transactions.iter().filter(|t| t.is_deletion()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error.is_some()
            || !self.failures.is_empty()
            || matches!(self.manifest, ManifestStatus::Failed { .. })
    }
}

#[derive(Debug)]
pub struct ReconcileRun {
    pub rawdata: PathBuf,
    pub dry_run: bool,
    pub units: Vec<UnitReconcileReport>,
}

impl ReconcileRun {
    pub fn has_errors(&self) -> bool {
        self.units.iter().any(UnitReconcileReport::has_errors)
    }
}

#[derive(Debug)]
pub struct UnitRepairReport {
    pub unit: String,
    pub fmap_dir: PathBuf,
    pub skipped: Option<String>,
    pub error: Option<String>,
    pub report: RepairReport,
}

#[derive(Debug)]
pub struct RepairRun {
    pub rawdata: PathBuf,
    pub dry_run: bool,
    pub units: Vec<UnitRepairReport>,
}

impl RepairRun {
    pub fn has_errors(&self) -> bool {
        self.units.iter().any(|unit| unit.error.is_some())
    }

    pub fn repaired(&self) -> usize {
        self.units.iter().map(|unit| unit.report.repaired.len()).sum()
    }
}
