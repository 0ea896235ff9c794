//! Error types for transform and resampling operations.
//!
//! Construction and composition validate eagerly and return these errors
//! up front, so a bad chain never reaches the middle of a resample.

use thiserror::Error;

/// Main error type for transform, chain and resampling operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// The transform has no well-defined inverse.
    #[error("Transform is not invertible: {0}")]
    NotInvertible(String),

    /// Two spaces or transforms disagree on spatial dimensionality.
    #[error("Space mismatch: {0}")]
    SpaceMismatch(String),

    /// A point fell outside a field or image under the `Error` policy.
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// Index past the end of a transform mapping.
    #[error("Index {index} out of range for mapping of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Bad construction parameters.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Data tensor shape does not match its coordinate space.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

impl TransformError {
    /// Create a not-invertible error.
    pub fn not_invertible(msg: impl Into<String>) -> Self {
        Self::NotInvertible(msg.into())
    }

    /// Create a space mismatch error.
    pub fn space_mismatch(msg: impl Into<String>) -> Self {
        Self::SpaceMismatch(msg.into())
    }

    /// Create an out-of-bounds error.
    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        Self::OutOfBounds(msg.into())
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a dimensionality mismatch error from two ndims.
    pub fn ndim_mismatch(what: &str, expected: usize, actual: usize) -> Self {
        Self::SpaceMismatch(format!(
            "{}: expected {} spatial dimensions, got {}",
            what, expected, actual
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TransformError::not_invertible("singular");
        assert!(matches!(err, TransformError::NotInvertible(_)));
    }

    #[test]
    fn test_error_display() {
        let err = TransformError::space_mismatch("chain link 1");
        assert_eq!(err.to_string(), "Space mismatch: chain link 1");
    }

    #[test]
    fn test_index_out_of_range_display() {
        let err = TransformError::IndexOutOfRange { index: 4, len: 3 };
        assert_eq!(
            err.to_string(),
            "Index 4 out of range for mapping of length 3"
        );
    }

    #[test]
    fn test_ndim_mismatch() {
        let err = TransformError::ndim_mismatch("points", 3, 2);
        let msg = err.to_string();
        assert!(msg.contains("expected 3"));
        assert!(msg.contains("got 2"));
    }
}
