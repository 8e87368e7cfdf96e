use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use bids_cli::pipeline::{classify_series_table, reconcile_study, repair_study, resolve_rule_set};
use bids_cli::types::{ClassifyResult, ReconcileRun, ReconcileRunOptions, RepairRun};
use bids_fmap::ReconcileOptions;
use bids_ingest::StudyLayout;

use crate::cli::{ClassifyArgs, FixIntendedForArgs, ReconcileArgs, RuleSourceArgs};
use crate::summary::print_rules;

pub fn run_classify(args: &ClassifyArgs) -> Result<ClassifyResult> {
    let span = info_span!("classify", subject = %args.subject);
    let _guard = span.enter();
    let rule_set = resolve_rule_set(args.rules.rules.as_deref(), args.rules.protocol.as_deref())?;
    let (series_read, assignment) = classify_series_table(
        &args.series_table,
        &args.subject,
        args.session.as_deref(),
        &rule_set,
    )?;
    info!(
        rule_set = rule_set.name(),
        series = series_read,
        categories = assignment.categories.len(),
        "classification complete"
    );

    let json = serde_json::to_string_pretty(&assignment).context("serialize assignment")?;
    match &args.output {
        Some(path) => {
            fs::write(path, format!("{json}\n"))
                .with_context(|| format!("write {}", path.display()))?;
        }
        None => println!("{json}"),
    }
    Ok(ClassifyResult {
        rule_set: rule_set.name().to_string(),
        series_table: args.series_table.clone(),
        series_read,
        assignment,
        output: args.output.clone(),
    })
}

pub fn run_reconcile(args: &ReconcileArgs) -> Result<ReconcileRun> {
    let layout = study_layout(&args.study_dir, args.bids_root.as_deref());
    let span = info_span!("reconcile", rawdata = %layout.rawdata.display());
    let _guard = span.enter();
    let options = ReconcileRunOptions {
        reconcile: ReconcileOptions {
            keep_extra: args.keep_extra,
            collision: args.on_collision.into(),
        },
        dry_run: args.dry_run,
    };
    reconcile_study(&layout, options)
}

pub fn run_fix_intended_for(args: &FixIntendedForArgs) -> Result<RepairRun> {
    let layout = study_layout(&args.study_dir, args.bids_root.as_deref());
    let span = info_span!("fix_intended_for", rawdata = %layout.rawdata.display());
    let _guard = span.enter();
    repair_study(&layout, args.dry_run)
}

pub fn run_rules(args: &RuleSourceArgs) -> Result<()> {
    let rule_set = resolve_rule_set(args.rules.as_deref(), args.protocol.as_deref())?;
    print_rules(&rule_set);
    Ok(())
}

fn study_layout(study_dir: &Path, bids_root: Option<&Path>) -> StudyLayout {
    let layout = StudyLayout::new(study_dir);
    match bids_root {
        Some(root) => layout.with_bids_root(root),
        None => layout,
    }
}
