use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use bids_cli::types::{
    ClassifyResult, ManifestStatus, ReconcileRun, RepairRun, UnitReconcileReport,
};
use bids_heuristics::RuleSet;

/// Renders the classification summary. The caller picks the stream because
/// stdout may already carry the JSON assignment.
pub fn classification_summary(result: &ClassifyResult) -> String {
    let mut lines = vec![
        format!("Rule set: {}", result.rule_set),
        format!(
            "Series table: {} ({} series)",
            result.series_table.display(),
            result.series_read
        ),
    ];
    if let Some(path) = &result.output {
        lines.push(format!("Assignment: {}", path.display()));
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Category"),
        header_cell("Destination"),
        header_cell("Series"),
        header_cell("Outputs"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for category in &result.assignment.categories {
        let series = category
            .series_numbers()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&category.key).fg(Color::Blue),
            Cell::new(&category.destination),
            Cell::new(series),
            Cell::new(category.outtypes.join(", ")),
        ]);
    }
    let unassigned = result
        .series_read
        .saturating_sub(distinct_series(result));
    table.add_row(vec![
        total_cell("TOTAL"),
        total_cell(format!("{} categories", result.assignment.categories.len())),
        Cell::new(result.assignment.series_count()).add_attribute(Attribute::Bold),
        if unassigned == 0 {
            dim_cell("-")
        } else {
            Cell::new(format!("{unassigned} unassigned")).fg(Color::Yellow)
        },
    ]);
    lines.push(table.to_string());
    lines.join("\n")
}

fn distinct_series(result: &ClassifyResult) -> usize {
    let mut numbers: Vec<u32> = result
        .assignment
        .categories
        .iter()
        .flat_map(|category| category.series_numbers())
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers.len()
}

pub fn print_reconcile(run: &ReconcileRun) {
    println!("BIDS root: {}", run.rawdata.display());
    if run.dry_run {
        println!("Dry run: no files were changed");
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Unit"),
        header_cell("Renamed"),
        header_cell("Deleted"),
        header_cell("Collisions"),
        header_cell("Failures"),
        header_cell("Manifest"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let (mut renamed, mut deleted, mut failures) = (0usize, 0usize, 0usize);
    for unit in &run.units {
        if let Some(reason) = &unit.skipped {
            table.add_row(vec![
                Cell::new(&unit.unit),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell(reason),
            ]);
            continue;
        }
        renamed += unit.renamed();
        deleted += unit.deleted();
        failures += unit.failures.len();
        table.add_row(vec![
            Cell::new(&unit.unit),
            Cell::new(unit.renamed()),
            Cell::new(unit.deleted()),
            count_cell(unit.collisions.len(), Color::Yellow),
            count_cell(unit.failures.len(), Color::Red),
            manifest_cell(unit),
        ]);
    }
    table.add_row(vec![
        total_cell("TOTAL"),
        Cell::new(renamed).add_attribute(Attribute::Bold),
        Cell::new(deleted).add_attribute(Attribute::Bold),
        dim_cell("-"),
        count_cell(failures, Color::Red).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");
    print_reconcile_details(run);
}

fn print_reconcile_details(run: &ReconcileRun) {
    for unit in &run.units {
        if let Some(sync) = &unit.recovered {
            println!(
                "{}: completed an interrupted run ({} rows renamed, {} dropped)",
                unit.unit, sync.renamed, sync.dropped
            );
        }
        for collision in &unit.collisions {
            eprintln!(
                "{}: kept existing {} (not renamed from {})",
                unit.unit, collision.destination, collision.name
            );
        }
        for warning in &unit.warnings {
            eprintln!("{}: warning: {warning}", unit.unit);
        }
    }
    let errors: Vec<String> = run
        .units
        .iter()
        .flat_map(|unit| {
            let mut messages = Vec::new();
            if let Some(error) = &unit.error {
                messages.push(format!("{}: {error}", unit.unit));
            }
            for failure in &unit.failures {
                messages.push(format!(
                    "{}: {} {} failed: {}",
                    unit.unit, failure.operation, failure.name, failure.message
                ));
            }
            if let ManifestStatus::Failed { path, message } = &unit.manifest {
                messages.push(format!("{}: {}: {message}", unit.unit, path.display()));
            }
            messages
        })
        .collect();
    if !errors.is_empty() {
        eprintln!("Errors:");
        for error in errors {
            eprintln!("- {error}");
        }
    }
}

fn manifest_cell(unit: &UnitReconcileReport) -> Cell {
    match &unit.manifest {
        ManifestStatus::Untouched => dim_cell("-"),
        ManifestStatus::Synced(sync) if sync.written => {
            Cell::new(format!("{} renamed, {} dropped", sync.renamed, sync.dropped))
                .fg(Color::Green)
        }
        ManifestStatus::Synced(sync) if sync.renamed + sync.dropped > 0 => {
            Cell::new(format!("{} renamed, {} dropped (not written)", sync.renamed, sync.dropped))
        }
        ManifestStatus::Synced(_) => dim_cell("unchanged"),
        ManifestStatus::Missing { .. } => Cell::new("missing").fg(Color::Yellow),
        ManifestStatus::Failed { .. } => Cell::new("failed").fg(Color::Red),
    }
}

pub fn print_repair(run: &RepairRun) {
    println!("BIDS root: {}", run.rawdata.display());
    if run.dry_run {
        println!("Dry run: no sidecars were rewritten");
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Unit"),
        header_cell("Sidecar"),
        header_cell("Direction"),
        header_cell("Before"),
        header_cell("After"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    for unit in &run.units {
        if let Some(reason) = &unit.skipped {
            table.add_row(vec![
                Cell::new(&unit.unit),
                dim_cell(reason),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
            ]);
            continue;
        }
        for sidecar in &unit.report.repaired {
            let after = if sidecar.after < sidecar.before {
                Cell::new(sidecar.after).fg(Color::Green)
            } else {
                Cell::new(sidecar.after)
            };
            table.add_row(vec![
                Cell::new(&unit.unit),
                Cell::new(&sidecar.name),
                Cell::new(&sidecar.direction),
                Cell::new(sidecar.before),
                after,
            ]);
        }
    }
    println!("{table}");
    println!("Repaired sidecars: {}", run.repaired());
    for unit in &run.units {
        for warning in &unit.report.warnings {
            eprintln!("{}: warning: {warning}", unit.unit);
        }
    }
    let errors: Vec<String> = run
        .units
        .iter()
        .filter_map(|unit| unit.error.as_ref().map(|e| format!("{}: {e}", unit.unit)))
        .collect();
    if !errors.is_empty() {
        eprintln!("Errors:");
        for error in errors {
            eprintln!("- {error}");
        }
    }
}

pub fn print_rules(rule_set: &RuleSet) {
    println!("Rule set: {}", rule_set.name());
    if let Some(description) = rule_set.description() {
        println!("{description}");
    }
    let thresholds: Vec<String> = rule_set
        .thresholds()
        .iter()
        .map(|(kind, volumes)| format!("{}={volumes}", kind.as_str()))
        .collect();
    if !thresholds.is_empty() {
        println!("Thresholds: {}", thresholds.join(", "));
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Key"),
        header_cell("When"),
        header_cell("Template"),
        header_cell("Outputs"),
    ]);
    apply_table_style(&mut table);
    for rule in rule_set.rules() {
        table.add_row(vec![
            Cell::new(&rule.key).fg(Color::Blue),
            Cell::new(rule.predicate.describe()),
            Cell::new(rule.template.as_str()),
            Cell::new(rule.outtypes.join(", ")),
        ]);
    }
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn total_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count == 0 {
        dim_cell(count)
    } else {
        Cell::new(count).fg(color)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
