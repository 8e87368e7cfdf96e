//! Typed predicates over series descriptors.
//!
//! A predicate is a tree of tagged variants evaluated by [`Predicate::evaluate`].
//! In rule files they are written as single-key inline tables, e.g.
//! `{ contains = "BOLD_REST" }` or `{ min_length = "func" }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bids_model::{AcquisitionKind, Direction, ImageTypeCode, SeriesDescriptor};

/// Minimum temporal length, either literal or looked up per acquisition kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LengthThreshold {
    Volumes(u32),
    Kind(AcquisitionKind),
}

/// Configured length thresholds per acquisition kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thresholds(BTreeMap<AcquisitionKind, u32>);

impl Thresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: AcquisitionKind, volumes: u32) {
        self.0.insert(kind, volumes);
    }

    pub fn get(&self, kind: AcquisitionKind) -> Option<u32> {
        self.0.get(&kind).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AcquisitionKind, u32)> + '_ {
        self.0.iter().map(|(kind, volumes)| (*kind, *volumes))
    }

    pub fn resolve(&self, threshold: LengthThreshold) -> Option<u32> {
        match threshold {
            LengthThreshold::Volumes(volumes) => Some(volumes),
            LengthThreshold::Kind(kind) => self.get(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Case-sensitive substring of the series description.
    Contains(String),
    Direction(Direction),
    /// `temporal_length >= threshold`.
    MinLength(LengthThreshold),
    Reference(bool),
    ImageType(ImageTypeCode),
    Kind(AcquisitionKind),
    All(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn contains(token: impl Into<String>) -> Self {
        Predicate::Contains(token.into())
    }

    pub fn min_volumes(volumes: u32) -> Self {
        Predicate::MinLength(LengthThreshold::Volumes(volumes))
    }

    pub fn min_length_for(kind: AcquisitionKind) -> Self {
        Predicate::MinLength(LengthThreshold::Kind(kind))
    }

    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::All(predicates.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    /// Evaluates the predicate. An unresolved kind threshold never matches.
    pub fn evaluate(&self, series: &SeriesDescriptor, thresholds: &Thresholds) -> bool {
        match self {
            Predicate::Contains(token) => series.description.contains(token.as_str()),
            Predicate::Direction(direction) => series.direction == Some(*direction),
            Predicate::MinLength(threshold) => thresholds
                .resolve(*threshold)
                .is_some_and(|volumes| series.temporal_length >= volumes),
            Predicate::Reference(expected) => series.is_reference_volume == *expected,
            Predicate::ImageType(code) => series.vendor_image_type_code == Some(*code),
            Predicate::Kind(kind) => series.acquisition_kind == *kind,
            Predicate::All(predicates) => predicates
                .iter()
                .all(|predicate| predicate.evaluate(series, thresholds)),
            Predicate::Not(predicate) => !predicate.evaluate(series, thresholds),
        }
    }

    /// Acquisition kinds whose thresholds this predicate looks up.
    pub fn threshold_kinds(&self) -> Vec<AcquisitionKind> {
        let mut kinds = Vec::new();
        self.collect_threshold_kinds(&mut kinds);
        kinds
    }

    fn collect_threshold_kinds(&self, kinds: &mut Vec<AcquisitionKind>) {
        match self {
            Predicate::MinLength(LengthThreshold::Kind(kind)) => kinds.push(*kind),
            Predicate::All(predicates) => {
                for predicate in predicates {
                    predicate.collect_threshold_kinds(kinds);
                }
            }
            Predicate::Not(predicate) => predicate.collect_threshold_kinds(kinds),
            _ => {}
        }
    }

    /// Short human-readable rendering used in rule listings.
    pub fn describe(&self) -> String {
        match self {
            Predicate::Contains(token) => format!("contains \"{token}\""),
            Predicate::Direction(direction) => format!("dir = {direction}"),
            Predicate::MinLength(LengthThreshold::Volumes(volumes)) => {
                format!("length >= {volumes}")
            }
            Predicate::MinLength(LengthThreshold::Kind(kind)) => format!("length >= {kind}"),
            Predicate::Reference(true) => "reference volume".to_string(),
            Predicate::Reference(false) => "not reference volume".to_string(),
            Predicate::ImageType(code) => format!("image type = {code}"),
            Predicate::Kind(kind) => format!("kind = {kind}"),
            Predicate::All(predicates) => predicates
                .iter()
                .map(Predicate::describe)
                .collect::<Vec<_>>()
                .join(" AND "),
            Predicate::Not(predicate) => format!("NOT ({})", predicate.describe()),
        }
    }
}
