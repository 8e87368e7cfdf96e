//! Discovery of subject/session units under a BIDS rawdata root.

use std::path::{Path, PathBuf};

use bids_model::{SessionLabel, SubjectLabel};

use crate::error::{IngestError, Result};

pub const FMAP_DIR: &str = "fmap";

/// A study directory and the BIDS root inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyLayout {
    pub study_dir: PathBuf,
    pub rawdata: PathBuf,
}

impl StudyLayout {
    /// Uses `<study>/bids/rawdata` as the BIDS root.
    pub fn new(study_dir: impl Into<PathBuf>) -> Self {
        let study_dir = study_dir.into();
        let rawdata = study_dir.join("bids").join("rawdata");
        Self { study_dir, rawdata }
    }

    #[must_use]
    pub fn with_bids_root(mut self, rawdata: impl Into<PathBuf>) -> Self {
        self.rawdata = rawdata.into();
        self
    }

    /// Lists units of work: `sub-*` directories, or their `ses-*` children
    /// when a subject has sessions. Units are sorted by subject, then session.
    pub fn units(&self) -> Result<Vec<SubjectUnit>> {
        if !self.rawdata.is_dir() {
            return Err(IngestError::RawdataNotFound {
                path: self.rawdata.clone(),
            });
        }
        let subject_dirs = list_prefixed_dirs(&self.rawdata, "sub-")?;
        if subject_dirs.is_empty() {
            return Err(IngestError::NoSubjects {
                path: self.rawdata.clone(),
            });
        }

        let mut units = Vec::new();
        for (name, dir) in subject_dirs {
            let subject = match SubjectLabel::new(&name) {
                Ok(subject) => subject,
                Err(error) => {
                    tracing::warn!(dir = %dir.display(), %error, "skipping subject directory");
                    continue;
                }
            };
            let session_dirs = match list_prefixed_dirs(&dir, "ses-") {
                Ok(session_dirs) => session_dirs,
                Err(error) => {
                    tracing::warn!(dir = %dir.display(), %error, "skipping unreadable subject directory");
                    continue;
                }
            };
            if session_dirs.is_empty() {
                units.push(SubjectUnit::new(subject, None, dir));
                continue;
            }
            for (session_name, session_dir) in session_dirs {
                match SessionLabel::new(&session_name) {
                    Ok(session) => {
                        units.push(SubjectUnit::new(subject.clone(), Some(session), session_dir));
                    }
                    Err(error) => {
                        tracing::warn!(dir = %session_dir.display(), %error, "skipping session directory");
                    }
                }
            }
        }
        Ok(units)
    }
}

/// One subject, or one session of a subject, holding an `fmap/` directory and
/// a scans manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectUnit {
    pub subject: SubjectLabel,
    pub session: Option<SessionLabel>,
    pub dir: PathBuf,
}

impl SubjectUnit {
    pub fn new(subject: SubjectLabel, session: Option<SessionLabel>, dir: PathBuf) -> Self {
        Self {
            subject,
            session,
            dir,
        }
    }

    /// `sub-01` or `sub-01_ses-1`.
    pub fn entity_prefix(&self) -> String {
        match &self.session {
            Some(session) => format!("{}_{}", self.subject.entity(), session.entity()),
            None => self.subject.entity(),
        }
    }

    pub fn fmap_dir(&self) -> PathBuf {
        self.dir.join(FMAP_DIR)
    }

    pub fn scans_tsv(&self) -> PathBuf {
        self.dir.join(format!("{}_scans.tsv", self.entity_prefix()))
    }

    /// `sub-01` or `sub-01/ses-1`, for messages.
    pub fn label(&self) -> String {
        match &self.session {
            Some(session) => format!("{}/{}", self.subject.entity(), session.entity()),
            None => self.subject.entity(),
        }
    }
}

fn list_prefixed_dirs(dir: &Path, prefix: &str) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut dirs = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if name.starts_with(prefix) {
            dirs.push((name.to_string(), path.clone()));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}
