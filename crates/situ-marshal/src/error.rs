//! Marshaling and steering error types.

use std::error::Error;
use std::fmt;

use situ_arena::ArenaError;
use situ_core::{CoreError, DType, Label};

/// Errors raised while marshaling an entry into the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarshalError {
    /// An entry's category is not handled by the visitor it reached.
    UnsupportedEntryType {
        /// The entry's label.
        label: Label,
        /// Category or element kind that was rejected.
        kind: String,
    },
    /// A field or particle layout has more axes than the graph supports.
    UnsupportedDimensionality {
        /// The entry's label.
        label: Label,
        /// Number of axes.
        dims: usize,
        /// Largest supported number of axes.
        max: usize,
    },
    /// A particle attribute holds fewer values than there are particles.
    AttributeLength {
        /// Attribute name.
        attribute: String,
        /// Values the attribute holds.
        len: usize,
        /// Particles in the collection.
        count: usize,
    },
    /// A core container rejected an operation.
    Core(CoreError),
    /// A buffer could not be copied or registered.
    Arena(ArenaError),
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedEntryType { label, kind } => {
                write!(f, "entry '{label}': unsupported entry type {kind}")
            }
            Self::UnsupportedDimensionality { label, dims, max } => {
                write!(f, "entry '{label}': {dims} axes unsupported (max {max})")
            }
            Self::AttributeLength {
                attribute,
                len,
                count,
            } => write!(
                f,
                "particle attribute '{attribute}' has {len} values for {count} particles"
            ),
            Self::Core(e) => write!(f, "core: {e}"),
            Self::Arena(e) => write!(f, "arena: {e}"),
        }
    }
}

impl Error for MarshalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Core(e) => Some(e),
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoreError> for MarshalError {
    fn from(e: CoreError) -> Self {
        Self::Core(e)
    }
}

impl From<ArenaError> for MarshalError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

/// Errors raised when reading a steered value back from the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SteeringError {
    /// The backward value is absent or not convertible to the target.
    UnsupportedSteeringType {
        /// The steered scalar's label.
        label: Label,
        /// What was found at the backward path.
        found: &'static str,
        /// The scalar type it had to convert to.
        target: DType,
    },
}

impl fmt::Display for SteeringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedSteeringType {
                label,
                found,
                target,
            } => {
                write!(
                    f,
                    "steering '{label}': cannot convert {found} to {target}"
                )
            }
        }
    }
}

impl Error for SteeringError {}
