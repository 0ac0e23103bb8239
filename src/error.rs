//! Error types for matalg

use thiserror::Error;

/// Result type alias using matalg's error
pub type Result<T> = std::result::Result<T, AlgebraError>;

/// Errors raised by storage, multiplication and parsing operations.
///
/// Every variant is reported at the point of violation; nothing is retried
/// or silently corrected.
#[derive(Error, Debug)]
pub enum AlgebraError {
    /// Element access outside the matrix extents
    #[error("index ({row}, {col}) out of bounds for {rows}x{cols} matrix")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Position outside a one-dimensional sequence (vector or diagonal)
    #[error("index {index} out of range for length {len}")]
    OutOfRange { index: usize, len: usize },

    /// Operand shapes are incompatible for multiplication
    #[error("cannot multiply {lhs:?} by {rhs:?} (shapes are rows, cols)")]
    DimensionMismatch {
        lhs: (usize, usize),
        rhs: (usize, usize),
    },

    /// Structurally invalid input; `line` is set for Matrix Market parse failures
    #[error("malformed input{}: {reason}", line_suffix(.line))]
    MalformedInput { line: Option<usize>, reason: String },

    /// A write would change the sparsity structure of a compressed matrix
    #[error("cannot insert a new entry at ({row}, {col}) into compressed storage")]
    UnsupportedMutation { row: usize, col: usize },

    /// A diagonal view was used after its backing matrix was resized or replaced
    #[error("diagonal view stamped {view:?} used against matrix stamped {matrix:?}")]
    UseAfterInvalidation {
        /// (matrix id, generation) recorded by the view
        view: (u64, u64),
        /// (matrix id, generation) of the matrix supplied at access time
        matrix: (u64, u64),
    },

    /// Invalid argument provided to an operation
    #[error("invalid argument '{arg}': {reason}")]
    InvalidArgument { arg: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" at line {line}"),
        None => String::new(),
    }
}

impl AlgebraError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        AlgebraError::MalformedInput {
            line: Some(line),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_structure(reason: impl Into<String>) -> Self {
        AlgebraError::MalformedInput {
            line: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        AlgebraError::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = AlgebraError::malformed(7, "bad value");
        assert_eq!(err.to_string(), "malformed input at line 7: bad value");

        let err = AlgebraError::malformed_structure("pointers decrease");
        assert_eq!(err.to_string(), "malformed input: pointers decrease");

        let err = AlgebraError::DimensionMismatch {
            lhs: (2, 3),
            rhs: (4, 2),
        };
        assert_eq!(
            err.to_string(),
            "cannot multiply (2, 3) by (4, 2) (shapes are rows, cols)"
        );
    }
}
