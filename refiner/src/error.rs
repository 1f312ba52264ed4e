//! Refiner-specific error types

use shared::{DiseaseId, SharedError};
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a diagnosis oracle for a single ranking request
///
/// Oracle failures inside a repetition are counted, not propagated; only the
/// baseline call and configuration mistakes abort a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Diagnosis oracle unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Diagnosis analysis failed: {reason}")]
    AnalysisFailed { reason: String },
}

impl OracleError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn analysis_failed(reason: impl Into<String>) -> Self {
        Self::AnalysisFailed {
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum RefinerError {
    #[error("Configuration error: {field}: {reason}")]
    Configuration { field: String, reason: String },

    #[error("Annotation file {path} could not be read: {reason}")]
    AnnotationFile { path: PathBuf, reason: String },

    #[error("None of the requested diseases are known: {disease_ids:?}")]
    MissingDisease { disease_ids: Vec<DiseaseId> },

    #[error("Diagnosis oracle unavailable: {reason}")]
    OracleUnavailable { reason: String },

    #[error("Diagnosis analysis failed: {reason}")]
    OracleAnalysisFailed { reason: String },

    #[error("Refinement run was cancelled")]
    Cancelled,

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RefinerError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<OracleError> for RefinerError {
    fn from(error: OracleError) -> Self {
        match error {
            OracleError::Unavailable { reason } => Self::OracleUnavailable { reason },
            OracleError::AnalysisFailed { reason } => Self::OracleAnalysisFailed { reason },
        }
    }
}

pub type RefinerResult<T> = Result<T, RefinerError>;
