//! Error types for series tables and study layout discovery.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading ingest inputs.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Directory not found or not readable.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Series table not found.
    #[error("series table not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Series Table Errors ===
    /// Failed to parse the TSV.
    #[error("failed to parse series table {path}: {message}")]
    TableParse { path: PathBuf, message: String },

    /// Required column not found in the header.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// A cell that cannot be interpreted.
    #[error("invalid {field} value '{value}' in {path} (line {line})")]
    InvalidValue {
        field: String,
        value: String,
        path: PathBuf,
        line: u64,
    },

    // === Layout Errors ===
    /// The BIDS rawdata root does not exist.
    #[error("rawdata directory not found: {path} (expected <study>/bids/rawdata or pass an explicit BIDS root)")]
    RawdataNotFound { path: PathBuf },

    /// The rawdata root has no `sub-*` directories.
    #[error("no subject directories (sub-*) found in {path}")]
    NoSubjects { path: PathBuf },
}

/// Result type for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::MissingColumn {
            column: "series_number".to_string(),
            path: PathBuf::from("/data/series.tsv"),
        };
        assert_eq!(
            err.to_string(),
            "required column 'series_number' not found in /data/series.tsv"
        );
    }

    #[test]
    fn test_layout_error_names_remediation() {
        let err = IngestError::RawdataNotFound {
            path: PathBuf::from("study/bids/rawdata"),
        };
        assert!(err.to_string().contains("explicit BIDS root"));
    }
}
