//! Buffer handles.
//!
//! A [`BufferHandle`] names one buffer in a [`BufferRegistry`](crate::BufferRegistry).
//! It is epoch-scoped: the `epoch` field allows O(1) staleness checks
//! after the registry has been cleared.

use std::fmt;

/// Reference to a registered host buffer.
///
/// Handles are plain data and may be copied into the exchange graph.
/// They resolve only against the registry epoch that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct BufferHandle {
    pub(crate) epoch: u32,
    pub(crate) slot: u32,
}

impl BufferHandle {
    pub(crate) fn new(epoch: u32, slot: u32) -> Self {
        Self { epoch, slot }
    }

    /// The registry epoch this handle belongs to.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Slot index within the registry.
    pub fn slot(&self) -> u32 {
        self.slot
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferHandle(epoch={}, slot={})", self.epoch, self.slot)
    }
}
