//! Error types for the frame-gating system

use std::fmt;

/// Custom error type for classifier training and pipeline evaluation
#[derive(Debug, Clone)]
pub enum GateError {
    /// E001: Training set is empty
    EmptyTrainingSet,
    /// E002: Feature vector dimensionality mismatch
    DimensionalityMismatch { expected: usize, found: usize },
    /// E003: Training set contains fewer than 2 distinct classes
    SingleClassTrainingSet(String),
    /// E004: Frame stream contains no frames
    EmptyStream(String),
    /// E005: Evaluation stream has no ground-truth labels
    MissingStreamLabels(String),
    /// E006: Configuration validation failed
    ConfigValidationFailed(String),
    /// E007: Invalid configuration parameter
    InvalidConfigParameter(String),
    /// E008: Report export error
    ReportExportError(String),
    /// E009: Processing pipeline error
    ProcessingError(String),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::EmptyTrainingSet => {
                write!(f, "E001: Training set is empty")
            }
            GateError::DimensionalityMismatch { expected, found } => {
                write!(
                    f,
                    "E002: Feature dimensionality mismatch (expected {}, found {})",
                    expected, found
                )
            }
            GateError::SingleClassTrainingSet(msg) => {
                write!(f, "E003: Training set is single-class - {}", msg)
            }
            GateError::EmptyStream(name) => {
                write!(f, "E004: Stream '{}' contains no frames", name)
            }
            GateError::MissingStreamLabels(name) => {
                write!(f, "E005: Stream '{}' has no ground-truth labels", name)
            }
            GateError::ConfigValidationFailed(msg) => {
                write!(f, "E006: Configuration validation failed - {}", msg)
            }
            GateError::InvalidConfigParameter(msg) => {
                write!(f, "E007: Invalid configuration parameter - {}", msg)
            }
            GateError::ReportExportError(msg) => {
                write!(f, "E008: Report export error - {}", msg)
            }
            GateError::ProcessingError(msg) => {
                write!(f, "E009: Processing pipeline error - {}", msg)
            }
        }
    }
}

impl std::error::Error for GateError {}

// From implementations for common error types
impl From<std::io::Error> for GateError {
    fn from(err: std::io::Error) -> Self {
        GateError::ReportExportError(format!("File I/O error: {}", err))
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::ReportExportError(format!("JSON serialization error: {}", err))
    }
}

impl From<anyhow::Error> for GateError {
    fn from(err: anyhow::Error) -> Self {
        GateError::ProcessingError(format!("Generic error: {}", err))
    }
}

/// Result type alias for frame-gating operations
pub type Result<T> = std::result::Result<T, GateError>;
