//! Data model for BIDS curation.
//!
//! Series descriptors feed the classifier, which produces an
//! [`OutputAssignment`]. After conversion, field-map directories are described
//! by [`FieldMapFile`] records and every change made to them is recorded in a
//! [`TransactionLog`].

pub mod assignment;
pub mod error;
pub mod fieldmap;
pub mod ids;
pub mod series;

pub use assignment::{AssignedCategory, AssignedRun, OutputAssignment};
pub use error::{ModelError, Result};
pub use fieldmap::{FieldMapFile, FieldMapImageType, RenameTransaction, TransactionLog};
pub use ids::{SessionLabel, SubjectLabel};
pub use series::{
    AcquisitionKind, Direction, ImageTypeCode, SeriesDescriptor, order_by_series_number,
};
