//! Error types for glance comparisons.

use thiserror::Error;

/// Result type alias using GlanceError.
pub type GlanceResult<T> = Result<T, GlanceError>;

/// Primary error type for comparison operations.
///
/// Every variant is local to a single variable comparison; callers decide
/// whether to log and continue or to abort.
#[derive(Debug, Error)]
pub enum GlanceError {
    // === Data Errors ===
    #[error("Shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    #[error("Failed to read data: {0}")]
    DataReadError(String),

    // === Configuration Errors ===
    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Invalid variable selector: {0}")]
    InvalidPattern(String),

    // === Infrastructure Errors ===
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl GlanceError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(
        context: impl Into<String>,
        expected: &[usize],
        found: &[usize],
    ) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable code used in reports.
    pub fn code(&self) -> &'static str {
        match self {
            GlanceError::ShapeMismatch { .. } => "ShapeMismatch",
            GlanceError::VariableNotFound(_) => "VariableNotFound",
            GlanceError::DataReadError(_) => "DataReadError",
            GlanceError::InvalidConfig { .. } => "InvalidConfig",
            GlanceError::InvalidPattern(_) => "InvalidPattern",
            GlanceError::InternalError(_) => "InternalError",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for GlanceError {
    fn from(err: std::io::Error) -> Self {
        GlanceError::DataReadError(err.to_string())
    }
}

impl From<serde_json::Error> for GlanceError {
    fn from(err: serde_json::Error) -> Self {
        GlanceError::DataReadError(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = GlanceError::shape_mismatch("ignore mask", &[2, 3], &[3, 2]);
        assert_eq!(err.code(), "ShapeMismatch");
        assert_eq!(
            err.to_string(),
            "Shape mismatch in ignore mask: expected [2, 3], found [3, 2]"
        );
    }

    #[test]
    fn test_io_error_becomes_data_read_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: GlanceError = io.into();
        assert!(matches!(err, GlanceError::DataReadError(_)));
    }
}
