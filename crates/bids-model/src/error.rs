use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid phase-encoding direction: {0}")]
    InvalidDirection(String),
    #[error("invalid acquisition kind: {0}")]
    InvalidAcquisitionKind(String),
    #[error("invalid image type code: {0}")]
    InvalidImageType(String),
    #[error("invalid {entity} label '{value}': labels must be alphanumeric")]
    InvalidLabel { entity: &'static str, value: String },
    #[error("{old_name} already has a recorded transaction")]
    DuplicateTransaction { old_name: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
