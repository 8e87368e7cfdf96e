//! Normalized scanner series metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Phase-encoding direction of an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "AP")]
    Ap,
    #[serde(rename = "PA")]
    Pa,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ap => "AP",
            Direction::Pa => "PA",
        }
    }

    /// Parses an optional direction cell; blank, `none` and `n/a` mean no direction.
    pub fn parse_optional(value: &str) -> Result<Option<Self>, ModelError> {
        let trimmed = value.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("none")
            || trimmed.eq_ignore_ascii_case("n/a")
        {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AP" => Ok(Direction::Ap),
            "PA" => Ok(Direction::Pa),
            _ => Err(ModelError::InvalidDirection(s.to_string())),
        }
    }
}

/// Coarse acquisition category reported by the series reader.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionKind {
    Anat,
    Func,
    Dwi,
    Fmap,
    #[default]
    Other,
}

impl AcquisitionKind {
    pub const ALL: [AcquisitionKind; 5] = [
        AcquisitionKind::Anat,
        AcquisitionKind::Func,
        AcquisitionKind::Dwi,
        AcquisitionKind::Fmap,
        AcquisitionKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionKind::Anat => "anat",
            AcquisitionKind::Func => "func",
            AcquisitionKind::Dwi => "dwi",
            AcquisitionKind::Fmap => "fmap",
            AcquisitionKind::Other => "other",
        }
    }
}

impl fmt::Display for AcquisitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcquisitionKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anat" => Ok(AcquisitionKind::Anat),
            "func" => Ok(AcquisitionKind::Func),
            "dwi" => Ok(AcquisitionKind::Dwi),
            "fmap" => Ok(AcquisitionKind::Fmap),
            "other" | "" => Ok(AcquisitionKind::Other),
            _ => Err(ModelError::InvalidAcquisitionKind(s.to_string())),
        }
    }
}

/// Vendor image-type flag carried on a series (DICOM ImageType value 3/4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageTypeCode {
    Magnitude,
    Phase,
    Real,
    Imaginary,
    Unknown,
}

impl ImageTypeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageTypeCode::Magnitude => "magnitude",
            ImageTypeCode::Phase => "phase",
            ImageTypeCode::Real => "real",
            ImageTypeCode::Imaginary => "imaginary",
            ImageTypeCode::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ImageTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageTypeCode {
    type Err = ModelError;

    /// Accepts the long names as well as the single-letter DICOM codes (M, P, R, I).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MAGNITUDE" | "M" => Ok(ImageTypeCode::Magnitude),
            "PHASE" | "P" => Ok(ImageTypeCode::Phase),
            "REAL" | "R" => Ok(ImageTypeCode::Real),
            "IMAGINARY" | "I" => Ok(ImageTypeCode::Imaginary),
            "UNKNOWN" => Ok(ImageTypeCode::Unknown),
            _ => Err(ModelError::InvalidImageType(s.to_string())),
        }
    }
}

/// One scanner series as produced by the external DICOM reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    pub series_number: u32,
    pub description: String,
    pub direction: Option<Direction>,
    pub acquisition_kind: AcquisitionKind,
    /// Number of volumes (dim4).
    pub temporal_length: u32,
    pub is_reference_volume: bool,
    pub vendor_image_type_code: Option<ImageTypeCode>,
}

impl SeriesDescriptor {
    pub fn new(series_number: u32, description: impl Into<String>) -> Self {
        Self {
            series_number,
            description: description.into(),
            direction: None,
            acquisition_kind: AcquisitionKind::Other,
            temporal_length: 1,
            is_reference_volume: false,
            vendor_image_type_code: None,
        }
    }

    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: AcquisitionKind) -> Self {
        self.acquisition_kind = kind;
        self
    }

    #[must_use]
    pub fn with_temporal_length(mut self, length: u32) -> Self {
        self.temporal_length = length;
        self
    }

    #[must_use]
    pub fn with_reference_volume(mut self, is_reference: bool) -> Self {
        self.is_reference_volume = is_reference;
        self
    }

    #[must_use]
    pub fn with_image_type(mut self, code: ImageTypeCode) -> Self {
        self.vendor_image_type_code = Some(code);
        self
    }
}

/// Orders descriptors by series number, keeping the relative order of equal numbers.
pub fn order_by_series_number(descriptors: &mut [SeriesDescriptor]) {
    descriptors.sort_by_key(|descriptor| descriptor.series_number);
}
