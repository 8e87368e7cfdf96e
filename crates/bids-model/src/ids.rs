#![deny(unsafe_code)]

use std::fmt;

use crate::ModelError;

fn normalize_label(
    entity: &'static str,
    prefix: &str,
    value: &str,
) -> Result<String, ModelError> {
    let trimmed = value.trim();
    let bare = trimmed.strip_prefix(prefix).unwrap_or(trimmed);
    if bare.is_empty() || !bare.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ModelError::InvalidLabel {
            entity,
            value: value.to_string(),
        });
    }
    Ok(bare.to_string())
}

/// Participant label without the `sub-` prefix.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SubjectLabel(String);

impl SubjectLabel {
    /// Accepts `01` or `sub-01`.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ModelError> {
        normalize_label("subject", "sub-", value.as_ref()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The BIDS entity form, e.g. `sub-01`.
    pub fn entity(&self) -> String {
        format!("sub-{}", self.0)
    }
}

impl fmt::Display for SubjectLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session label without the `ses-` prefix.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SessionLabel(String);

impl SessionLabel {
    /// Accepts `1` or `ses-1`.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ModelError> {
        normalize_label("session", "ses-", value.as_ref()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn entity(&self) -> String {
        format!("ses-{}", self.0)
    }
}

impl fmt::Display for SessionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
