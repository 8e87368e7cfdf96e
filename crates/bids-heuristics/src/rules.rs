//! Rule sets: ordered classification rules plus their length thresholds.

use std::collections::BTreeSet;

use bids_model::{AcquisitionKind, SeriesDescriptor};

use crate::error::{HeuristicError, Result};
use crate::predicate::{Predicate, Thresholds};
use crate::template::DestinationTemplate;

pub const DEFAULT_OUTTYPE: &str = "nii.gz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    pub key: String,
    pub description: Option<String>,
    pub template: DestinationTemplate,
    pub outtypes: Vec<String>,
    pub predicate: Predicate,
}

impl ClassificationRule {
    /// A template using `{direction}` only accepts descriptors that carry one.
    pub fn matches(&self, series: &SeriesDescriptor, thresholds: &Thresholds) -> bool {
        if self.template.uses_direction() && series.direction.is_none() {
            return false;
        }
        self.predicate.evaluate(series, thresholds)
    }
}

/// Validated, ordered rules. Construct through [`RuleSet::builder`] or
/// [`RuleSet::from_config`](crate::config).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    name: String,
    description: Option<String>,
    thresholds: Thresholds,
    rules: Vec<ClassificationRule>,
}

impl RuleSet {
    pub fn builder(name: impl Into<String>) -> RuleSetBuilder {
        RuleSetBuilder {
            name: name.into(),
            description: None,
            thresholds: Thresholds::new(),
            rules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn rule(&self, key: &str) -> Option<&ClassificationRule> {
        self.rules.iter().find(|rule| rule.key == key)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Clone)]
struct PendingRule {
    key: String,
    description: Option<String>,
    template: String,
    outtypes: Vec<String>,
    when: Vec<Predicate>,
}

#[derive(Debug, Clone)]
pub struct RuleSetBuilder {
    name: String,
    description: Option<String>,
    thresholds: Thresholds,
    rules: Vec<PendingRule>,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn threshold(mut self, kind: AcquisitionKind, volumes: u32) -> Self {
        self.thresholds.set(kind, volumes);
        self
    }

    /// Adds a rule whose conditions must all hold.
    #[must_use]
    pub fn rule(
        self,
        key: impl Into<String>,
        template: impl Into<String>,
        when: impl IntoIterator<Item = Predicate>,
    ) -> Self {
        self.rule_with_outtypes(key, template, Vec::<String>::new(), when)
    }

    #[must_use]
    pub fn rule_with_outtypes(
        mut self,
        key: impl Into<String>,
        template: impl Into<String>,
        outtypes: impl IntoIterator<Item = impl Into<String>>,
        when: impl IntoIterator<Item = Predicate>,
    ) -> Self {
        self.rules.push(PendingRule {
            key: key.into(),
            description: None,
            template: template.into(),
            outtypes: outtypes.into_iter().map(Into::into).collect(),
            when: when.into_iter().collect(),
        });
        self
    }

    pub(crate) fn rule_description(mut self, description: Option<String>) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.description = description;
        }
        self
    }

    pub fn build(self) -> Result<RuleSet> {
        if self.rules.is_empty() {
            return Err(HeuristicError::EmptyRuleSet { name: self.name });
        }
        let mut seen = BTreeSet::new();
        let mut rules = Vec::with_capacity(self.rules.len());
        for pending in self.rules {
            if !seen.insert(pending.key.clone()) {
                return Err(HeuristicError::DuplicateRule { key: pending.key });
            }
            let mut when = pending.when;
            let predicate = match when.len() {
                0 => return Err(HeuristicError::EmptyPredicate { key: pending.key }),
                1 => when.remove(0),
                _ => Predicate::All(when),
            };
            if let Some(kind) = predicate
                .threshold_kinds()
                .into_iter()
                .find(|kind| self.thresholds.get(*kind).is_none())
            {
                return Err(HeuristicError::MissingThreshold {
                    key: pending.key,
                    kind,
                });
            }
            let template = DestinationTemplate::parse(&pending.template).map_err(|error| {
                HeuristicError::InvalidTemplate {
                    key: pending.key.clone(),
                    template: pending.template.clone(),
                    message: error.to_string(),
                }
            })?;
            let outtypes = if pending.outtypes.is_empty() {
                vec![DEFAULT_OUTTYPE.to_string()]
            } else {
                pending.outtypes
            };
            rules.push(ClassificationRule {
                key: pending.key,
                description: pending.description,
                template,
                outtypes,
                predicate,
            });
        }
        Ok(RuleSet {
            name: self.name,
            description: self.description,
            thresholds: self.thresholds,
            rules,
        })
    }
}
