//! Per-unit processing shared by the subcommands.
//!
//! Units are processed one after another. A unit that cannot be processed is
//! reported and the run continues with the next one.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, error, info_span, warn};

use bids_fmap::{
    apply_plan, completed_transactions, journal_path, log_directory_contents, plan_reconciliation,
    recover_manifest, remove_journal, repair_intended_for, sync_manifest, take_snapshot,
    write_journal,
};
use bids_heuristics::{RuleSet, builtin_rule_set, classify, default_rule_set, load_rule_set};
use bids_ingest::{StudyLayout, SubjectUnit, load_series_table};
use bids_model::{OutputAssignment, SessionLabel, SubjectLabel, TransactionLog};

use crate::types::{
    ManifestStatus, ReconcileRun, ReconcileRunOptions, RepairRun, UnitReconcileReport,
    UnitRepairReport,
};

/// `--protocol` wins, then a rule file, then the default protocol.
pub fn resolve_rule_set(rules: Option<&Path>, protocol: Option<&str>) -> Result<RuleSet> {
    if let Some(name) = protocol {
        return builtin_rule_set(name).with_context(|| format!("load protocol {name}"));
    }
    if let Some(path) = rules {
        return load_rule_set(path).with_context(|| format!("load rules: {}", path.display()));
    }
    default_rule_set().context("load default protocol")
}

/// Loads a series table and classifies it. Returns the number of series read
/// alongside the assignment.
pub fn classify_series_table(
    series_table: &Path,
    subject: &str,
    session: Option<&str>,
    rule_set: &RuleSet,
) -> Result<(usize, OutputAssignment)> {
    let subject = SubjectLabel::new(subject).context("subject label")?;
    let session = session
        .map(SessionLabel::new)
        .transpose()
        .context("session label")?;
    let descriptors = load_series_table(series_table)
        .with_context(|| format!("read series table: {}", series_table.display()))?;
    let assignment = classify(rule_set, &descriptors, &subject, session.as_ref())
        .with_context(|| format!("classify with {}", rule_set.name()))?;
    Ok((descriptors.len(), assignment))
}

pub fn reconcile_study(layout: &StudyLayout, options: ReconcileRunOptions) -> Result<ReconcileRun> {
    let units = layout
        .units()
        .with_context(|| format!("discover subjects in {}", layout.rawdata.display()))?;
    let units = units
        .iter()
        .map(|unit| reconcile_unit(unit, options))
        .collect();
    Ok(ReconcileRun {
        rawdata: layout.rawdata.clone(),
        dry_run: options.dry_run,
        units,
    })
}

/// Reconciles one unit's field maps, then mirrors the changes into its
/// manifest. A journal left by an interrupted run is replayed first.
pub fn reconcile_unit(unit: &SubjectUnit, options: ReconcileRunOptions) -> UnitReconcileReport {
    let span = info_span!("unit", unit = %unit.label());
    let _guard = span.enter();
    let fmap_dir = unit.fmap_dir();
    let mut report = UnitReconcileReport::new(unit.label(), fmap_dir.clone());

    if !fmap_dir.is_dir() {
        warn!(expected = %fmap_dir.display(), "no field-map directory; skipping unit");
        report.skipped = Some(format!("no field-map directory at {}", fmap_dir.display()));
        return report;
    }

    let scans = unit.scans_tsv();
    let has_manifest = scans.is_file();
    if has_manifest {
        match recover_manifest(&fmap_dir, &scans, options.dry_run) {
            Ok(recovered) => report.recovered = recovered,
            Err(err) => {
                // A new journal would overwrite the pending one.
                error!(%err, "interrupted run could not be completed; unit left unchanged");
                report.error = Some(err.to_string());
                return report;
            }
        }
    }

    let plan = match take_snapshot(&fmap_dir) {
        Ok(snapshot) => plan_reconciliation(&snapshot, options.reconcile),
        Err(err) => {
            error!(%err, "field-map snapshot failed");
            report.error = Some(err.to_string());
            return report;
        }
    };
    debug!(actions = plan.actions.len(), "reconciliation planned");
    report.collisions = plan.skipped.clone();
    report.warnings = plan.warnings.clone();
    let planned = plan.transactions();
    let journal = journal_path(&scans);

    // In a dry run the manifest preview follows the plan; otherwise it follows
    // what actually changed on disk.
    let manifest_log: TransactionLog = if options.dry_run {
        report.transactions = planned.clone();
        planned.into_iter().collect()
    } else {
        if has_manifest
            && !planned.is_empty()
            && let Err(err) = write_journal(&journal, &planned)
        {
            error!(%err, "journal not written; field maps left unchanged");
            report.error = Some(err.to_string());
            return report;
        }
        let outcome = apply_plan(&plan);
        log_directory_contents(&fmap_dir);
        report.transactions = outcome.log.entries().to_vec();
        report.failures = outcome.failures;
        completed_transactions(&fmap_dir, &planned)
    };

    if !has_manifest {
        if !manifest_log.is_empty() {
            warn!(expected = %scans.display(), "scan manifest not found; not synchronized");
            report.manifest = ManifestStatus::Missing { path: scans };
        }
        return report;
    }
    if !manifest_log.is_empty() {
        match sync_manifest(&scans, &manifest_log, options.dry_run) {
            Ok(sync) => report.manifest = ManifestStatus::Synced(sync),
            Err(err) => {
                error!(%err, "scan manifest left unchanged; journal kept for the next run");
                report.manifest = ManifestStatus::Failed {
                    path: scans,
                    message: err.to_string(),
                };
                return report;
            }
        }
    }
    if !options.dry_run
        && let Err(err) = remove_journal(&journal)
    {
        warn!(%err, "journal not removed");
        report.warnings.push(err.to_string());
    }
    report
}

pub fn repair_study(layout: &StudyLayout, dry_run: bool) -> Result<RepairRun> {
    let units = layout
        .units()
        .with_context(|| format!("discover subjects in {}", layout.rawdata.display()))?;
    let units = units.iter().map(|unit| repair_unit(unit, dry_run)).collect();
    Ok(RepairRun {
        rawdata: layout.rawdata.clone(),
        dry_run,
        units,
    })
}

pub fn repair_unit(unit: &SubjectUnit, dry_run: bool) -> UnitRepairReport {
    let span = info_span!("unit", unit = %unit.label());
    let _guard = span.enter();
    let fmap_dir = unit.fmap_dir();
    let mut report = UnitRepairReport {
        unit: unit.label(),
        fmap_dir: fmap_dir.clone(),
        skipped: None,
        error: None,
        report: Default::default(),
    };
    if !fmap_dir.is_dir() {
        debug!(expected = %fmap_dir.display(), "no field-map directory; skipping unit");
        report.skipped = Some(format!("no field-map directory at {}", fmap_dir.display()));
        return report;
    }
    match repair_intended_for(&fmap_dir, dry_run) {
        Ok(repair) => report.report = repair,
        Err(err) => {
            error!(%err, "IntendedFor repair failed");
            report.error = Some(err.to_string());
        }
    }
    report
}
