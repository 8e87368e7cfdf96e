//! One-time listing of a field-map directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use bids_model::{FieldMapFile, FieldMapImageType};

use crate::error::{FmapError, Result};
use crate::sidecar::read_image_type;

pub const SIDECAR_EXTENSION: &str = ".json";
pub const IMAGE_EXTENSIONS: [&str; 2] = [".nii.gz", ".nii"];

/// Converter-assigned names: `magnitude<echo><disambiguator>` at the end of
/// the stem. Canonical `magnitude1`/`phase2` stems never match.
static PROVISIONAL_STEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>.*)magnitude(?P<echo>[12])[A-Za-z0-9]$")
        .expect("Invalid provisional stem regex")
});

/// Provisional stem split into its prefix and echo slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionalStem {
    pub prefix: String,
    pub echo: u8,
}

pub fn parse_provisional_stem(stem: &str) -> Option<ProvisionalStem> {
    let captures = PROVISIONAL_STEM.captures(stem)?;
    let echo = captures.name("echo")?.as_str().parse().ok()?;
    Some(ProvisionalStem {
        prefix: captures.name("prefix")?.as_str().to_string(),
        echo,
    })
}

/// Splits a file name into stem and extension for the extensions we group.
pub fn split_name(name: &str) -> Option<(&str, &str)> {
    IMAGE_EXTENSIONS
        .iter()
        .chain(std::iter::once(&SIDECAR_EXTENSION))
        .find_map(|ext| {
            name.strip_suffix(ext)
                .filter(|stem| !stem.is_empty())
                .map(|stem| (stem, *ext))
        })
}

/// Directory contents captured before any mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapSnapshot {
    pub dir: PathBuf,
    /// Every entry name, sorted.
    pub names: Vec<String>,
    /// Image/sidecar groups, sorted by stem.
    pub files: Vec<FieldMapFile>,
    /// Problems met while reading sidecars.
    pub warnings: Vec<String>,
}

impl FieldMapSnapshot {
    pub fn file(&self, stem: &str) -> Option<&FieldMapFile> {
        self.files.iter().find(|file| file.stem == stem)
    }
}

/// Lists `dir` once and reads the sidecars of provisional files.
///
/// A sidecar that cannot be read or parsed leaves the file `unknown` and adds
/// a warning; it never fails the snapshot.
pub fn take_snapshot(dir: &Path) -> Result<FieldMapSnapshot> {
    if !dir.is_dir() {
        return Err(FmapError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|e| FmapError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut names = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| FmapError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if !entry.path().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();

    let mut groups: BTreeMap<String, FieldMapFile> = BTreeMap::new();
    for name in &names {
        let Some((stem, ext)) = split_name(name) else {
            continue;
        };
        let file = groups
            .entry(stem.to_string())
            .or_insert_with(|| FieldMapFile {
                stem: stem.to_string(),
                image_name: None,
                sidecar_name: None,
                image_type: FieldMapImageType::Unknown,
                echo_number: None,
            });
        if ext == SIDECAR_EXTENSION {
            file.sidecar_name = Some(name.clone());
        } else if file.image_name.is_none() {
            file.image_name = Some(name.clone());
        }
    }

    let mut warnings = Vec::new();
    let mut files: Vec<FieldMapFile> = groups.into_values().collect();
    for file in &mut files {
        let Some(provisional) = parse_provisional_stem(&file.stem) else {
            continue;
        };
        file.echo_number = Some(provisional.echo);
        let Some(sidecar_name) = &file.sidecar_name else {
            continue;
        };
        match read_image_type(&dir.join(sidecar_name)) {
            Ok(image_type) => file.image_type = image_type,
            Err(error) => {
                tracing::warn!(%error, "sidecar unreadable; treating image type as unknown");
                warnings.push(error.to_string());
            }
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        entries = names.len(),
        groups = files.len(),
        "field-map snapshot taken"
    );
    Ok(FieldMapSnapshot {
        dir: dir.to_path_buf(),
        names,
        files,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisional_stems() {
        assert_eq!(
            parse_provisional_stem("sub-01_magnitude11"),
            Some(ProvisionalStem {
                prefix: "sub-01_".to_string(),
                echo: 1
            })
        );
        assert_eq!(
            parse_provisional_stem("sub-01_run-01_magnitude2a").map(|p| p.echo),
            Some(2)
        );
        assert_eq!(parse_provisional_stem("sub-01_magnitude1"), None);
        assert_eq!(parse_provisional_stem("sub-01_phase12"), None);
        assert_eq!(parse_provisional_stem("sub-01_magnitude31"), None);
        assert_eq!(parse_provisional_stem("sub-01_magnitude123"), None);
    }

    #[test]
    fn name_splitting() {
        assert_eq!(split_name("a_magnitude1.nii.gz"), Some(("a_magnitude1", ".nii.gz")));
        assert_eq!(split_name("a_magnitude1.nii"), Some(("a_magnitude1", ".nii")));
        assert_eq!(split_name("a.json"), Some(("a", ".json")));
        assert_eq!(split_name("notes.txt"), None);
        assert_eq!(split_name(".json"), None);
    }
}
