use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid FITS file {path}: {reason}")]
    InvalidFits { path: PathBuf, reason: String },

    #[error("Unrecognized frame type '{value}' in {path}")]
    UnrecognizedFrameType { path: PathBuf, value: String },

    #[error("Missing calibration data: no zero frames for night {night_id}")]
    MissingCalibrationData { night_id: String },

    #[error("Output directory {path} is not empty")]
    OutputNotEmpty { path: PathBuf },

    #[error("Reduction engine failure during {operation}: {reason}")]
    ReductionEngineFailure {
        operation: &'static str,
        reason: String,
    },

    #[error("Image dimensions {actual:?} do not match {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Empty {0} frame group")]
    EmptyGroup(String),

    #[error("Frame group holds {actual} frames, expected {expected}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Wrap any displayable engine-side failure.
    pub fn engine(operation: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::ReductionEngineFailure {
            operation,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
