//! Core error types.

use std::error::Error;
use std::fmt;

/// Errors raised when constructing or indexing core containers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// Supplied data does not match the declared extents.
    ShapeMismatch {
        /// Number of scalars implied by the extents.
        expected: usize,
        /// Number of scalars supplied.
        actual: usize,
    },
    /// More axes than the operation supports.
    UnsupportedDimensionality {
        /// Number of axes requested.
        dims: usize,
        /// Largest supported number of axes.
        max: usize,
    },
    /// A multi-index lies outside the array extents.
    IndexOutOfBounds {
        /// Offending axis.
        axis: usize,
        /// Index on that axis.
        index: usize,
        /// Extent of that axis.
        extent: usize,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected} scalars, got {actual}")
            }
            Self::UnsupportedDimensionality { dims, max } => {
                write!(f, "unsupported dimensionality: {dims} axes (max {max})")
            }
            Self::IndexOutOfBounds {
                axis,
                index,
                extent,
            } => {
                write!(f, "index {index} out of bounds on axis {axis} (extent {extent})")
            }
        }
    }
}

impl Error for CoreError {}
