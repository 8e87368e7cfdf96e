//! Field-map files and the reconciliation transaction log.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// True image type of a field-map file, as read from its sidecar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldMapImageType {
    Magnitude,
    Phase,
    #[default]
    Unknown,
}

impl FieldMapImageType {
    /// Classifies a sidecar `ImageType` token list.
    ///
    /// Any token containing `PHASE` wins over tokens containing `MAGNITUDE`.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        let upper: Vec<String> = tokens
            .iter()
            .map(|token| token.as_ref().to_uppercase())
            .collect();
        if upper.iter().any(|token| token.contains("PHASE")) {
            FieldMapImageType::Phase
        } else if upper.iter().any(|token| token.contains("MAGNITUDE")) {
            FieldMapImageType::Magnitude
        } else {
            FieldMapImageType::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldMapImageType::Magnitude => "magnitude",
            FieldMapImageType::Phase => "phase",
            FieldMapImageType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FieldMapImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image and its sidecar, grouped by shared stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapFile {
    pub stem: String,
    /// Image file name (`.nii.gz` or `.nii`), if present.
    pub image_name: Option<String>,
    /// Sidecar file name (`.json`), if present.
    pub sidecar_name: Option<String>,
    pub image_type: FieldMapImageType,
    pub echo_number: Option<u8>,
}

impl FieldMapFile {
    /// Name used in transaction logs and manifests: the image, or the sidecar
    /// when the image is missing.
    pub fn on_disk_name(&self) -> &str {
        self.image_name
            .as_deref()
            .or(self.sidecar_name.as_deref())
            .unwrap_or(&self.stem)
    }

    /// Image extension including the leading dot, defaulting to `.nii.gz`.
    pub fn image_extension(&self) -> &str {
        match self.image_name.as_deref() {
            Some(name) if name.ends_with(".nii") => ".nii",
            _ => ".nii.gz",
        }
    }
}

/// A single rename or deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameTransaction {
    pub old_name: String,
    /// `None` marks a deletion.
    pub new_name: Option<String>,
}

impl RenameTransaction {
    pub fn rename(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: Some(new_name.into()),
        }
    }

    pub fn delete(old_name: impl Into<String>) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: None,
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.new_name.is_none()
    }
}

impl fmt::Display for RenameTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.new_name {
            Some(new_name) => write!(f, "{} -> {}", self.old_name, new_name),
            None => write!(f, "{} -> (deleted)", self.old_name),
        }
    }
}

/// Append-only log of transactions for one subject. An old name is recorded at
/// most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "Vec<RenameTransaction>",
    into = "Vec<RenameTransaction>"
)]
pub struct TransactionLog {
    entries: Vec<RenameTransaction>,
    seen: BTreeSet<String>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, transaction: RenameTransaction) -> Result<(), ModelError> {
        if !self.seen.insert(transaction.old_name.clone()) {
            return Err(ModelError::DuplicateTransaction {
                old_name: transaction.old_name,
            });
        }
        self.entries.push(transaction);
        Ok(())
    }

    pub fn entries(&self) -> &[RenameTransaction] {
        &self.entries
    }

    pub fn renames(&self) -> impl Iterator<Item = &RenameTransaction> {
        self.entries.iter().filter(|entry| !entry.is_deletion())
    }

    pub fn deletions(&self) -> impl Iterator<Item = &RenameTransaction> {
        self.entries.iter().filter(|entry| entry.is_deletion())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<RenameTransaction> for TransactionLog {
    /// Later duplicates of an old name are dropped.
    fn from_iter<I: IntoIterator<Item = RenameTransaction>>(iter: I) -> Self {
        let mut log = TransactionLog::new();
        for transaction in iter {
            let _ = log.record(transaction);
        }
        log
    }
}

impl From<Vec<RenameTransaction>> for TransactionLog {
    fn from(entries: Vec<RenameTransaction>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<TransactionLog> for Vec<RenameTransaction> {
    fn from(log: TransactionLog) -> Self {
        log.entries
    }
}
