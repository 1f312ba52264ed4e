//! Shared error types for the refinement engine

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SharedError {
    #[error("Invalid term identifier: {input}")]
    InvalidTermId { input: String },

    #[error("Invalid phenotype profile: {reason}")]
    InvalidProfile { reason: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
