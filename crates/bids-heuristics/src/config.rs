//! TOML form of a rule set.
//!
//! ```toml
//! [rule_set]
//! name = "harp"
//!
//! [thresholds]
//! func = 200
//!
//! [[rules]]
//! key = "func_rest_pa"
//! template = "sub-{subject}/{session}/func/sub-{subject}_{session}_task-rest_dir-PA_run-{item}_bold"
//! when = [{ contains = "BOLD_REST" }, { direction = "PA" }, { min_length = "func" }]
//! ```

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use bids_model::AcquisitionKind;

use crate::error::{HeuristicError, Result};
use crate::predicate::Predicate;
use crate::rules::RuleSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetConfig {
    pub rule_set: RuleSetHeader,
    #[serde(default)]
    pub thresholds: BTreeMap<String, u32>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetHeader {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub key: String,
    pub template: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub outtypes: Vec<String>,
    #[serde(default)]
    pub when: Vec<Predicate>,
}

impl RuleSet {
    pub fn from_config(config: RuleSetConfig) -> Result<Self> {
        let mut builder = RuleSet::builder(config.rule_set.name);
        if let Some(description) = config.rule_set.description {
            builder = builder.description(description);
        }
        for (name, volumes) in config.thresholds {
            let kind: AcquisitionKind = name
                .parse()
                .map_err(|_| HeuristicError::UnknownThreshold { name: name.clone() })?;
            builder = builder.threshold(kind, volumes);
        }
        for rule in config.rules {
            builder = builder
                .rule_with_outtypes(rule.key, rule.template, rule.outtypes, rule.when)
                .rule_description(rule.description);
        }
        builder.build()
    }
}

/// Parses rule-set TOML; `origin` is only used in error messages.
pub fn parse_rule_set(contents: &str, origin: &Path) -> Result<RuleSet> {
    let config: RuleSetConfig = toml::from_str(contents).map_err(|e| HeuristicError::Toml {
        path: origin.to_path_buf(),
        source: e,
    })?;
    RuleSet::from_config(config)
}

pub fn load_rule_set(path: &Path) -> Result<RuleSet> {
    let contents = std::fs::read_to_string(path).map_err(|e| HeuristicError::io(path, e))?;
    let rule_set = parse_rule_set(&contents, path)?;
    tracing::debug!(
        path = %path.display(),
        name = rule_set.name(),
        rules = rule_set.len(),
        "loaded rule set"
    );
    Ok(rule_set)
}
