//! Classification output consumed by the external converter.

use serde::{Deserialize, Serialize};

use crate::ids::{SessionLabel, SubjectLabel};

/// One series placed into a category at a given run position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedRun {
    pub series_number: u32,
    /// 1-based discovery position within the category.
    pub run: u32,
    /// Relative destination path without extension.
    pub path: String,
}

/// A destination category: every series matched by one rule that renders to the
/// same destination pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedCategory {
    /// Key of the rule that produced the category.
    pub key: String,
    /// Destination with subject, session and direction filled in; the run
    /// position is still the `{item}` placeholder.
    pub destination: String,
    pub outtypes: Vec<String>,
    pub runs: Vec<AssignedRun>,
}

impl AssignedCategory {
    pub fn series_numbers(&self) -> Vec<u32> {
        self.runs.iter().map(|run| run.series_number).collect()
    }

    /// Concrete file paths, one per run and output type.
    pub fn file_paths(&self) -> Vec<String> {
        let mut files = Vec::new();
        for run in &self.runs {
            for outtype in &self.outtypes {
                files.push(format!("{}.{}", run.path, outtype));
            }
        }
        files
    }
}

/// Mapping from destination category to the ordered series it received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputAssignment {
    pub subject: SubjectLabel,
    pub session: Option<SessionLabel>,
    pub categories: Vec<AssignedCategory>,
}

impl OutputAssignment {
    pub fn new(subject: SubjectLabel, session: Option<SessionLabel>) -> Self {
        Self {
            subject,
            session,
            categories: Vec::new(),
        }
    }

    /// Returns the first category produced by the given rule key.
    pub fn category(&self, key: &str) -> Option<&AssignedCategory> {
        self.categories.iter().find(|category| category.key == key)
    }

    pub fn categories_for<'a>(
        &'a self,
        key: &'a str,
    ) -> impl Iterator<Item = &'a AssignedCategory> + 'a {
        self.categories
            .iter()
            .filter(move |category| category.key == key)
    }

    /// All assigned paths in category order.
    pub fn paths(&self) -> Vec<&str> {
        self.categories
            .iter()
            .flat_map(|category| category.runs.iter().map(|run| run.path.as_str()))
            .collect()
    }

    pub fn series_count(&self) -> usize {
        self.categories
            .iter()
            .map(|category| category.runs.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
