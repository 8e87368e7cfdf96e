//! Series classification.

use bids_model::{
    AssignedCategory, AssignedRun, OutputAssignment, SeriesDescriptor, SessionLabel, SubjectLabel,
};

use crate::error::{HeuristicError, Result};
use crate::rules::RuleSet;
use crate::template::fill_item;

struct PendingCategory {
    rule_index: usize,
    destination: String,
    series: Vec<u32>,
}

/// Assigns every descriptor to the categories of all rules it satisfies.
///
/// Descriptors are visited in the order given; that order is the discovery
/// order, so a series' run index is its 1-based position among the series of
/// the same category. Categories are returned in rule order and, within one
/// rule, in the order their destination was first produced.
pub fn classify(
    rule_set: &RuleSet,
    descriptors: &[SeriesDescriptor],
    subject: &SubjectLabel,
    session: Option<&SessionLabel>,
) -> Result<OutputAssignment> {
    let thresholds = rule_set.thresholds();
    let mut pending: Vec<PendingCategory> = Vec::new();

    for series in descriptors {
        let mut matched = false;
        for (rule_index, rule) in rule_set.rules().iter().enumerate() {
            if !rule.matches(series, thresholds) {
                continue;
            }
            let destination = rule
                .template
                .destination(subject, session, series.direction)
                .map_err(|_| missing_direction(&rule.key, series))?;
            match pending
                .iter_mut()
                .find(|c| c.rule_index == rule_index && c.destination == destination)
            {
                Some(category) => category.series.push(series.series_number),
                None => pending.push(PendingCategory {
                    rule_index,
                    destination,
                    series: vec![series.series_number],
                }),
            }
            matched = true;
        }
        if !matched {
            tracing::debug!(
                series_number = series.series_number,
                description = %series.description,
                "series matched no rule"
            );
        }
    }

    pending.sort_by_key(|category| category.rule_index);

    let mut assignment = OutputAssignment::new(subject.clone(), session.cloned());
    for category in pending {
        let rule = &rule_set.rules()[category.rule_index];
        let runs = (1u32..)
            .zip(category.series)
            .map(|(run, series_number)| AssignedRun {
                series_number,
                run,
                path: fill_item(&category.destination, run),
            })
            .collect();
        assignment.categories.push(AssignedCategory {
            key: rule.key.clone(),
            destination: category.destination,
            outtypes: rule.outtypes.clone(),
            runs,
        });
    }

    tracing::debug!(
        subject = %subject,
        categories = assignment.categories.len(),
        series = assignment.series_count(),
        "classification complete"
    );
    Ok(assignment)
}

fn missing_direction(key: &str, series: &SeriesDescriptor) -> HeuristicError {
    HeuristicError::MissingDirection {
        key: key.to_string(),
        series_number: series.series_number,
    }
}

