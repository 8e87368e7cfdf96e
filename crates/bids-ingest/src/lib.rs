//! Inputs of a curation run: series tables from the DICOM reader and the
//! subject/session layout of a converted BIDS tree.

pub mod error;
pub mod layout;
pub mod series_table;

pub use error::{IngestError, Result};
pub use layout::{FMAP_DIR, StudyLayout, SubjectUnit};
pub use series_table::{
    infer_direction, infer_reference_volume, load_series_table, series_dir_name,
};
