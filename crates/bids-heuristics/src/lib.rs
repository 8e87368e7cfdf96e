//! Declarative classification of scanner series into BIDS destinations.
//!
//! A [`RuleSet`] is an ordered list of rules, each pairing a typed
//! [`Predicate`] with a [`DestinationTemplate`]. Rule sets are data: they are
//! loaded from TOML files or taken from the built-in protocols, then applied
//! to series descriptors by [`classify`].

pub mod classify;
pub mod config;
pub mod error;
pub mod predicate;
pub mod protocols;
pub mod rules;
pub mod template;

pub use classify::classify;
pub use config::{RuleConfig, RuleSetConfig, RuleSetHeader, load_rule_set, parse_rule_set};
pub use error::{HeuristicError, Result, TemplateError};
pub use predicate::{LengthThreshold, Predicate, Thresholds};
pub use protocols::{DEFAULT_PROTOCOL, builtin_protocol_names, builtin_rule_set, default_rule_set};
pub use rules::{ClassificationRule, DEFAULT_OUTTYPE, RuleSet, RuleSetBuilder};
pub use template::{DestinationTemplate, MODALITY_DIRS, fill_item, format_item};
