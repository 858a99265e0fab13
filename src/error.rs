use thiserror::Error;

use crate::parameters::{BoundsError, ParameterError};

/// Error types for the wtfit-rs library.
#[derive(Error, Debug)]
pub enum FitError {
    /// Malformed input detected before a run starts (empty data, too many
    /// free parameters, out-of-bound initial values, ...).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The model evaluator failed or returned non-finite / mismatched output.
    #[error("Model evaluation error: {0}")]
    ModelEvaluation(String),

    /// The damped normal equations could not be solved.
    #[error("Singular normal-equation system")]
    SingularSystem,

    /// A fit is already active on this engine instance.
    #[error("A fit is already running on this engine")]
    AlreadyRunning,

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error for parameter-related problems.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// The worker finished without delivering a completion event.
    #[error("Fit worker disconnected before completion")]
    WorkerDisconnected,

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<BoundsError> for FitError {
    fn from(err: BoundsError) -> Self {
        FitError::Parameter(ParameterError::Bounds(err))
    }
}

/// Result type alias for wtfit-rs operations.
pub type Result<T> = std::result::Result<T, FitError>;
