//! Series tables written by the external DICOM reader.
//!
//! One row per series, tab separated. `series_number` and `description` are
//! required; `direction`, `acquisition_kind`, `temporal_length`,
//! `is_reference_volume` and `image_type` are optional and inferred or
//! defaulted when absent or blank.

use std::collections::BTreeMap;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use bids_model::{
    AcquisitionKind, Direction, ImageTypeCode, SeriesDescriptor, order_by_series_number,
};

use crate::error::{IngestError, Result};

pub const SERIES_NUMBER: &str = "series_number";
pub const DESCRIPTION: &str = "description";
pub const DIRECTION: &str = "direction";
pub const ACQUISITION_KIND: &str = "acquisition_kind";
pub const TEMPORAL_LENGTH: &str = "temporal_length";
pub const IS_REFERENCE_VOLUME: &str = "is_reference_volume";
pub const IMAGE_TYPE: &str = "image_type";

/// Loads a series table and returns descriptors ordered by series number.
pub fn load_series_table(path: &Path) -> Result<Vec<SeriesDescriptor>> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| parse_error(path, &e))?;

    let headers = reader.headers().map_err(|e| parse_error(path, &e))?.clone();
    let columns: BTreeMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.to_ascii_lowercase(), idx))
        .collect();
    for required in [SERIES_NUMBER, DESCRIPTION] {
        if !columns.contains_key(required) {
            return Err(IngestError::MissingColumn {
                column: required.to_string(),
                path: path.to_path_buf(),
            });
        }
    }

    let mut descriptors = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| parse_error(path, &e))?;
        let row = Row {
            record: &record,
            columns: &columns,
            path,
            line: record.position().map_or(0, |pos| pos.line()),
        };
        if row.is_blank() {
            continue;
        }
        descriptors.push(row.descriptor()?);
    }

    order_by_series_number(&mut descriptors);
    tracing::debug!(
        path = %path.display(),
        series = descriptors.len(),
        "loaded series table"
    );
    Ok(descriptors)
}

struct Row<'a> {
    record: &'a StringRecord,
    columns: &'a BTreeMap<String, usize>,
    path: &'a Path,
    line: u64,
}

impl Row<'_> {
    fn cell(&self, column: &str) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|idx| self.record.get(*idx))
            .filter(|value| !value.is_empty())
    }

    fn is_blank(&self) -> bool {
        self.record.iter().all(str::is_empty)
    }

    fn invalid(&self, field: &str, value: &str) -> IngestError {
        IngestError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            path: self.path.to_path_buf(),
            line: self.line,
        }
    }

    fn descriptor(&self) -> Result<SeriesDescriptor> {
        let number = self.cell(SERIES_NUMBER).unwrap_or_default();
        let series_number: u32 = number
            .parse()
            .map_err(|_| self.invalid(SERIES_NUMBER, number))?;
        let description = self.cell(DESCRIPTION).unwrap_or_default().to_string();

        let direction = match self.cell(DIRECTION) {
            Some(value) => {
                Direction::parse_optional(value).map_err(|_| self.invalid(DIRECTION, value))?
            }
            None => infer_direction(&description),
        };
        let acquisition_kind = match self.cell(ACQUISITION_KIND) {
            Some(value) => value
                .parse::<AcquisitionKind>()
                .map_err(|_| self.invalid(ACQUISITION_KIND, value))?,
            None => AcquisitionKind::Other,
        };
        let temporal_length = match self.cell(TEMPORAL_LENGTH) {
            Some(value) => value
                .parse::<u32>()
                .map_err(|_| self.invalid(TEMPORAL_LENGTH, value))?,
            None => 1,
        };
        let is_reference_volume = match self.cell(IS_REFERENCE_VOLUME) {
            Some(value) => parse_flag(value).ok_or_else(|| self.invalid(IS_REFERENCE_VOLUME, value))?,
            None => infer_reference_volume(&description),
        };
        let vendor_image_type_code = match self.cell(IMAGE_TYPE) {
            Some(value) => Some(
                value
                    .parse::<ImageTypeCode>()
                    .map_err(|_| self.invalid(IMAGE_TYPE, value))?,
            ),
            None => None,
        };

        Ok(SeriesDescriptor {
            series_number,
            description,
            direction,
            acquisition_kind,
            temporal_length,
            is_reference_volume,
            vendor_image_type_code,
        })
    }
}

fn parse_error(path: &Path, error: &csv::Error) -> IngestError {
    IngestError::TableParse {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// First `AP`/`PA` token of a description split on `_`, `-` and spaces.
pub fn infer_direction(description: &str) -> Option<Direction> {
    description
        .split(['_', '-', ' '])
        .find_map(|token| match token {
            "AP" => Some(Direction::Ap),
            "PA" => Some(Direction::Pa),
            _ => None,
        })
}

pub fn infer_reference_volume(description: &str) -> bool {
    description.to_ascii_lowercase().contains("sbref")
}

/// Directory name a sorted series is stored under, e.g. `07_BOLD_REST1_PA`.
pub fn series_dir_name(series: &SeriesDescriptor) -> String {
    let description: String = series
        .description
        .replace(' ', "_")
        .chars()
        .filter(|ch| !matches!(ch, '\\' | '/' | ':' | '?' | '*' | '"' | '<' | '>' | '|' | '(' | ')'))
        .collect();
    format!("{:02}_{description}", series.series_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_tokens() {
        assert_eq!(infer_direction("BOLD_REST1_PA"), Some(Direction::Pa));
        assert_eq!(infer_direction("SE-Field AP"), Some(Direction::Ap));
        assert_eq!(infer_direction("MAPPING_PAIR"), None);
        assert_eq!(infer_direction("T1_MPR"), None);
    }

    #[test]
    fn reference_flag_is_case_insensitive() {
        assert!(infer_reference_volume("BOLD_REST1_PA_SBRef"));
        assert!(infer_reference_volume("dwi_sbref"));
        assert!(!infer_reference_volume("BOLD_REST1_PA"));
    }

    #[test]
    fn dir_name_strips_forbidden_characters() {
        let series = SeriesDescriptor::new(3, "T1 MPR (sag) 1/2: a*b?");
        assert_eq!(series_dir_name(&series), "03_T1_MPR_sag_12_ab");
        let series = SeriesDescriptor::new(112, "DWI_PA");
        assert_eq!(series_dir_name(&series), "112_DWI_PA");
    }
}
