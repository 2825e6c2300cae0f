//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use situ_core::{CoreError, Label};

use crate::handle::BufferHandle;

/// Errors that can occur during buffer registry and transfer operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// A handle from an epoch that has since been cleared.
    StaleHandle {
        /// The epoch encoded in the handle.
        handle_epoch: u32,
        /// The registry's current epoch.
        current: u32,
    },
    /// The handle's slot was released when its label was replaced.
    ReleasedSlot {
        /// The offending handle.
        handle: BufferHandle,
    },
    /// An operation required a label that is not registered.
    UnknownLabel {
        /// The missing label.
        label: Label,
    },
    /// A graph view was requested before staged transfers were fenced.
    NotFenced,
    /// A copy window does not fit the source array.
    WindowOutOfBounds {
        /// Offending axis.
        axis: usize,
        /// End of the requested window on that axis.
        end: usize,
        /// Extent of that axis.
        extent: usize,
    },
    /// Buffer data does not match its declared shape.
    Shape(CoreError),
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleHandle {
                handle_epoch,
                current,
            } => {
                write!(f, "stale handle: epoch {handle_epoch}, current epoch {current}")
            }
            Self::ReleasedSlot { handle } => {
                write!(f, "buffer for {handle} was released")
            }
            Self::UnknownLabel { label } => {
                write!(f, "no buffers registered under label '{label}'")
            }
            Self::NotFenced => {
                write!(f, "registry has unfenced transfers")
            }
            Self::WindowOutOfBounds { axis, end, extent } => {
                write!(f, "copy window ends at {end} on axis {axis}, extent is {extent}")
            }
            Self::Shape(e) => write!(f, "buffer shape: {e}"),
        }
    }
}

impl Error for ArenaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoreError> for ArenaError {
    fn from(e: CoreError) -> Self {
        Self::Shape(e)
    }
}
