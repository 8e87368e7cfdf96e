//! Scan manifests (`sub-<s>[_ses-<t>]_scans.tsv`).
//!
//! The manifest is validated with the `csv` reader (tab delimited, quoting
//! off) but kept line by line, so rows that no transaction touches are written
//! back byte for byte, line endings and blank lines included.
//!
//! Files in `fmap/` change before the manifest does. Until [`sync_manifest`]
//! has run, the manifest may name files that were renamed or removed; see
//! [`crate::journal`] for how an interrupted run is completed.

use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;

use bids_model::{RenameTransaction, TransactionLog};

use crate::error::{FmapError, Result};

pub const FILENAME_COLUMN: &str = "filename";
pub const FMAP_PREFIX: &str = "fmap";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ManifestLine {
    /// Header and blank lines, including their terminator.
    Verbatim(String),
    Row {
        record: StringRecord,
        text: String,
        ending: String,
    },
}

impl ManifestLine {
    fn filename(&self, index: usize) -> Option<&str> {
        match self {
            ManifestLine::Row { record, .. } => record.get(index),
            ManifestLine::Verbatim(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanManifest {
    path: PathBuf,
    filename_index: usize,
    lines: Vec<ManifestLine>,
}

/// Row changes from applying transactions to a manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowChanges {
    pub renamed: usize,
    pub dropped: usize,
}

impl RowChanges {
    pub fn any(&self) -> bool {
        self.renamed > 0 || self.dropped > 0
    }
}

impl ScanManifest {
    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| FmapError::read(path, e))?;
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .has_headers(true)
            .from_reader(contents.as_bytes());
        let headers = reader.headers().map_err(|e| parse_error(path, &e))?.clone();
        let filename_index = headers
            .iter()
            .position(|name| name == FILENAME_COLUMN)
            .ok_or_else(|| FmapError::MissingFilenameColumn {
                path: path.to_path_buf(),
            })?;
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| parse_error(path, &e))?;
        let lines = split_lines(path, &contents, records)?;
        Ok(Self {
            path: path.to_path_buf(),
            filename_index,
            lines,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .filter_map(|line| line.filename(self.filename_index))
    }

    /// Applies transactions in order. A rename also drops any other row that
    /// already names the destination, since that file was replaced.
    pub fn apply(&mut self, transactions: &[RenameTransaction], prefix: &str) -> RowChanges {
        let index = self.filename_index;
        let mut changes = RowChanges::default();
        for transaction in transactions {
            let old = format!("{prefix}/{}", transaction.old_name);
            match &transaction.new_name {
                Some(new_name) => {
                    let new = format!("{prefix}/{new_name}");
                    if !self.filenames().any(|name| name == old) {
                        continue;
                    }
                    changes.dropped += self.drop_rows(&new);
                    for line in &mut self.lines {
                        if let ManifestLine::Row { record, text, .. } = line
                            && record.get(index) == Some(old.as_str())
                        {
                            *record = replace_field(record, index, &new);
                            *text = record.iter().collect::<Vec<_>>().join("\t");
                            changes.renamed += 1;
                        }
                    }
                }
                None => changes.dropped += self.drop_rows(&old),
            }
        }
        changes
    }

    /// Writes to a sibling temporary file and renames it over the manifest.
    pub fn write(&self) -> Result<()> {
        let mut contents = String::new();
        for line in &self.lines {
            match line {
                ManifestLine::Verbatim(raw) => contents.push_str(raw),
                ManifestLine::Row { text, ending, .. } => {
                    contents.push_str(text);
                    contents.push_str(ending);
                }
            }
        }
        write_atomic(&self.path, contents.as_bytes())
    }

    fn drop_rows(&mut self, filename: &str) -> usize {
        let index = self.filename_index;
        let before = self.lines.len();
        self.lines
            .retain(|line| line.filename(index) != Some(filename));
        before - self.lines.len()
    }
}

/// Pairs each non-blank line after the header with the record parsed from it.
fn split_lines(path: &Path, contents: &str, records: Vec<StringRecord>) -> Result<Vec<ManifestLine>> {
    let mut records = records.into_iter();
    let mut header_seen = false;
    let mut lines = Vec::new();
    for raw in contents.split_inclusive('\n') {
        let (text, ending) = split_ending(raw);
        if text.is_empty() || !header_seen {
            header_seen |= !text.is_empty();
            lines.push(ManifestLine::Verbatim(raw.to_string()));
            continue;
        }
        let record = records
            .next()
            .filter(|record| record.iter().eq(text.split('\t')))
            .ok_or_else(|| misaligned(path))?;
        lines.push(ManifestLine::Row {
            record,
            text: text.to_string(),
            ending: ending.to_string(),
        });
    }
    if records.next().is_some() {
        return Err(misaligned(path));
    }
    Ok(lines)
}

fn split_ending(raw: &str) -> (&str, &str) {
    if let Some(text) = raw.strip_suffix("\r\n") {
        (text, "\r\n")
    } else if let Some(text) = raw.strip_suffix('\n') {
        (text, "\n")
    } else {
        (raw, "")
    }
}

/// Replaces `path` with `contents` through a sibling temporary file, keeping
/// the original permissions.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| FmapError::write(dir, e))?;
    if let Ok(metadata) = std::fs::metadata(path) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| FmapError::write(path, e))?;
    }
    temp.as_file_mut()
        .write_all(contents)
        .and_then(|()| temp.as_file_mut().flush())
        .map_err(|e| FmapError::write(path, e))?;
    temp.persist(path)
        .map_err(|e| FmapError::write(path, e.error))?;
    Ok(())
}

fn replace_field(row: &StringRecord, index: usize, value: &str) -> StringRecord {
    row.iter()
        .enumerate()
        .map(|(idx, field)| if idx == index { value } else { field })
        .collect()
}

fn parse_error(path: &Path, error: &csv::Error) -> FmapError {
    FmapError::ManifestParse {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

fn misaligned(path: &Path) -> FmapError {
    FmapError::ManifestParse {
        path: path.to_path_buf(),
        message: "rows do not line up with their lines (unsupported line endings?)".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub path: PathBuf,
    pub renamed: usize,
    pub dropped: usize,
    pub written: bool,
}

/// Mirrors a transaction log into the manifest at `path`.
///
/// The manifest is parsed completely before anything is changed; on a parse
/// failure the file is left as it was. It is only rewritten when a row changed.
pub fn sync_manifest(path: &Path, log: &TransactionLog, dry_run: bool) -> Result<SyncReport> {
    let mut manifest = ScanManifest::read(path)?;
    let changes = manifest.apply(log.entries(), FMAP_PREFIX);
    let written = changes.any() && !dry_run;
    if written {
        manifest.write()?;
    }
    tracing::info!(
        manifest = %path.display(),
        renamed = changes.renamed,
        dropped = changes.dropped,
        written,
        "scan manifest synchronized"
    );
    Ok(SyncReport {
        path: path.to_path_buf(),
        renamed: changes.renamed,
        dropped: changes.dropped,
        written,
    })
}
