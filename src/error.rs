//! Error types for sleepwake-flux

use thiserror::Error;

/// Errors that can occur while detecting sleep/wake events
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Input table is empty")]
    EmptyInput,

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid value in column '{column}' at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("Invalid timestamp at row {row}: '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("Missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Classifier returned {actual} probability rows, expected {expected}")]
    PredictionShape { expected: usize, actual: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error classification exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected input; the caller can fix the request
    Data,
    /// The classifier artifact could not be loaded or used
    ModelUnavailable,
    /// Anything else; callers should not leak the detail
    Internal,
}

impl ErrorKind {
    /// Stable code used by the CLI and FFI surfaces
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Data => "DATA_ERROR",
            ErrorKind::ModelUnavailable => "MODEL_UNAVAILABLE",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl DetectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DetectError::EmptyInput
            | DetectError::MissingColumns(_)
            | DetectError::ColumnLengthMismatch { .. }
            | DetectError::InvalidValue { .. }
            | DetectError::InvalidTimestamp { .. }
            | DetectError::MissingFeatures(_)
            | DetectError::ParseError(_)
            | DetectError::JsonError(_)
            | DetectError::InvalidConfig(_) => ErrorKind::Data,
            DetectError::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            DetectError::PredictionShape { .. } | DetectError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(DetectError::EmptyInput.kind(), ErrorKind::Data);
        assert_eq!(
            DetectError::MissingColumns(vec!["enmo".to_string()]).kind(),
            ErrorKind::Data
        );
        assert_eq!(
            DetectError::ModelUnavailable("gone".to_string()).kind(),
            ErrorKind::ModelUnavailable
        );
        assert_eq!(
            DetectError::PredictionShape { expected: 3, actual: 2 }.kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_missing_columns_message() {
        let err = DetectError::MissingColumns(vec!["step".to_string(), "enmo".to_string()]);
        assert_eq!(err.to_string(), "Missing required columns: step, enmo");
    }
}
