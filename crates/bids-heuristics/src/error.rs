#![deny(unsafe_code)]

use std::path::PathBuf;

use bids_model::AcquisitionKind;

#[derive(Debug, thiserror::Error)]
pub enum HeuristicError {
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rule file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown built-in protocol: {name} (available: {available})")]
    UnknownProtocol { name: String, available: String },

    #[error("rule set {name} declares no rules")]
    EmptyRuleSet { name: String },

    #[error("duplicate rule key: {key}")]
    DuplicateRule { key: String },

    #[error("rule {key} has no conditions")]
    EmptyPredicate { key: String },

    #[error("threshold {name} is not an acquisition kind")]
    UnknownThreshold { name: String },

    #[error("rule {key} references the {kind} length threshold, which is not configured")]
    MissingThreshold { key: String, kind: AcquisitionKind },

    #[error("invalid template for rule {key}: {message} ({template})")]
    InvalidTemplate {
        key: String,
        template: String,
        message: String,
    },

    #[error("rule {key} needs a phase-encoding direction but series {series_number} has none")]
    MissingDirection { key: String, series_number: u32 },
}

impl HeuristicError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, HeuristicError>;

/// A destination template that cannot be parsed, validated or rendered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("unbalanced braces at byte {0}")]
    UnbalancedBraces(usize),

    #[error("{0}")]
    Naming(String),

    #[error("template uses {{direction}} but no direction was given")]
    MissingDirection,
}
