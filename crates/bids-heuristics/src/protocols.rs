//! Rule sets shipped with the crate.

use std::path::Path;

use crate::config::parse_rule_set;
use crate::error::{HeuristicError, Result};
use crate::rules::RuleSet;

pub const DEFAULT_PROTOCOL: &str = "harp";

const BUILTIN_PROTOCOLS: [(&str, &str); 3] = [
    ("harp", include_str!("../protocols/harp.toml")),
    ("ge-fieldmap", include_str!("../protocols/ge-fieldmap.toml")),
    (
        "siemens-phasediff",
        include_str!("../protocols/siemens-phasediff.toml"),
    ),
];

pub fn builtin_protocol_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_PROTOCOLS.iter().map(|(name, _)| *name)
}

pub fn builtin_rule_set(name: &str) -> Result<RuleSet> {
    let (_, contents) = BUILTIN_PROTOCOLS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .ok_or_else(|| HeuristicError::UnknownProtocol {
            name: name.to_string(),
            available: builtin_protocol_names().collect::<Vec<_>>().join(", "),
        })?;
    parse_rule_set(contents, Path::new(&format!("<builtin:{name}>")))
}

pub fn default_rule_set() -> Result<RuleSet> {
    builtin_rule_set(DEFAULT_PROTOCOL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_protocol_loads() {
        for name in builtin_protocol_names() {
            let rule_set = builtin_rule_set(name).expect("builtin protocol");
            assert_eq!(rule_set.name(), name);
            assert!(!rule_set.is_empty());
        }
    }

    #[test]
    fn unknown_protocol_lists_alternatives() {
        let error = builtin_rule_set("philips").unwrap_err();
        assert!(error.to_string().contains("harp, ge-fieldmap"));
    }
}
