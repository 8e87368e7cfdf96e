//! `IntendedFor` repair for field-map sidecars.
//!
//! A field map acquired in one phase-encoding direction should only be
//! intended for scans of the same direction. Entries whose `_dir-<TOKEN>_`
//! differs from the sidecar's own are removed; order is preserved and nothing
//! is ever added.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::{FmapError, Result};
use crate::sidecar::{read_sidecar, write_sidecar};
use crate::snapshot::SIDECAR_EXTENSION;

pub const INTENDED_FOR: &str = "IntendedFor";

static DIRECTION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_dir-([A-Z]+)_").expect("Invalid direction token regex"));

/// The `_dir-<TOKEN>_` token of a file name or relative path.
pub fn direction_token(name: &str) -> Option<&str> {
    DIRECTION_TOKEN
        .captures(name)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str())
}

/// Entries of `IntendedFor` whose direction token equals `direction`.
/// Non-string entries never match.
pub fn filter_intended_for(entries: &[Value], direction: &str) -> Vec<Value> {
    entries
        .iter()
        .filter(|entry| {
            entry
                .as_str()
                .and_then(direction_token)
                .is_some_and(|token| token == direction)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairedSidecar {
    pub name: String,
    pub direction: String,
    pub before: usize,
    pub after: usize,
    pub written: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Sidecars whose `IntendedFor` shrank.
    pub repaired: Vec<RepairedSidecar>,
    /// Sidecars that were inspected.
    pub inspected: usize,
    pub warnings: Vec<String>,
}

/// Repairs every sidecar in `fmap_dir`. Malformed sidecars become warnings.
pub fn repair_intended_for(fmap_dir: &Path, dry_run: bool) -> Result<RepairReport> {
    if !fmap_dir.is_dir() {
        return Err(FmapError::DirectoryNotFound {
            path: fmap_dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(fmap_dir).map_err(|e| FmapError::DirectoryRead {
        path: fmap_dir.to_path_buf(),
        source: e,
    })?;
    let mut names: Vec<String> = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| FmapError::DirectoryRead {
            path: fmap_dir.to_path_buf(),
            source: e,
        })?;
        if let Some(name) = entry.file_name().to_str()
            && name.ends_with(SIDECAR_EXTENSION)
        {
            names.push(name.to_string());
        }
    }
    names.sort();

    let mut report = RepairReport::default();
    for name in names {
        let Some(direction) = direction_token(&name).map(str::to_string) else {
            continue;
        };
        report.inspected += 1;
        match repair_sidecar(&fmap_dir.join(&name), &direction, dry_run) {
            Ok(Some((before, after, written))) => {
                tracing::info!(sidecar = %name, before, after, written, "IntendedFor reduced");
                report.repaired.push(RepairedSidecar {
                    name,
                    direction,
                    before,
                    after,
                    written,
                });
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(sidecar = %name, %error, "skipping sidecar");
                report.warnings.push(error.to_string());
            }
        }
    }
    Ok(report)
}

/// Returns `(before, after, written)` when the entry count changed.
fn repair_sidecar(path: &Path, direction: &str, dry_run: bool) -> Result<Option<(usize, usize, bool)>> {
    let mut sidecar = read_sidecar(path)?;
    let entries = match sidecar.get(INTENDED_FOR) {
        Some(Value::Array(entries)) => entries.clone(),
        Some(value @ Value::String(_)) => vec![value.clone()],
        Some(_) | None => return Ok(None),
    };
    let kept = filter_intended_for(&entries, direction);
    if kept.len() == entries.len() {
        return Ok(None);
    }
    let (before, after) = (entries.len(), kept.len());
    if dry_run {
        return Ok(Some((before, after, false)));
    }
    sidecar.insert(INTENDED_FOR.to_string(), Value::Array(kept));
    write_sidecar(path, &sidecar)?;
    Ok(Some((before, after, true)))
}
