//! Graph error types.

use std::error::Error;
use std::fmt;

use situ_arena::ArenaError;
use situ_core::DType;

/// Errors raised while reading the exchange graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// No node exists at the requested path.
    MissingPath {
        /// The path that was looked up.
        path: String,
    },
    /// An external reference disagrees with its buffer's dtype.
    DtypeMismatch {
        /// Dtype recorded in the reference.
        expected: DType,
        /// Dtype of the registered buffer.
        actual: DType,
    },
    /// Stride or offset is not a multiple of the element size.
    Misaligned {
        /// Stride in bytes.
        stride_bytes: usize,
        /// Element type.
        dtype: DType,
    },
    /// A strided read runs past the end of its buffer.
    OutOfBounds {
        /// Number of elements requested.
        count: usize,
        /// Length of the buffer in scalars.
        len: usize,
    },
    /// The referenced buffer could not be resolved.
    Arena(ArenaError),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPath { path } => write!(f, "no node at '{path}'"),
            Self::DtypeMismatch { expected, actual } => {
                write!(f, "external array declared {expected}, buffer holds {actual}")
            }
            Self::Misaligned {
                stride_bytes,
                dtype,
            } => {
                write!(f, "stride of {stride_bytes} bytes is not aligned to {dtype}")
            }
            Self::OutOfBounds { count, len } => {
                write!(f, "strided read of {count} elements exceeds buffer of {len} scalars")
            }
            Self::Arena(e) => write!(f, "buffer resolution failed: {e}"),
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for GraphError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}
