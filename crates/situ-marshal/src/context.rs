//! Mutable state shared by the marshalers during one cycle.

use situ_arena::BufferRegistry;
use situ_graph::Node;

use crate::mask::GhostMaskCache;

/// Everything a marshaler writes into.
///
/// Borrowed from the orchestrator for the duration of a visit; the
/// fields are disjoint so a marshaler can hold a graph node while
/// registering buffers.
#[derive(Debug)]
pub struct MarshalContext<'c> {
    /// The outgoing exchange graph.
    pub graph: &'c mut Node,
    /// Owner of every host buffer the graph references.
    pub buffers: &'c mut BufferRegistry,
    /// Ghost masks keyed by geometry.
    pub masks: &'c mut GhostMaskCache,
}

impl<'c> MarshalContext<'c> {
    /// Bundle the three targets.
    pub fn new(
        graph: &'c mut Node,
        buffers: &'c mut BufferRegistry,
        masks: &'c mut GhostMaskCache,
    ) -> Self {
        Self {
            graph,
            buffers,
            masks,
        }
    }
}

/// Result of a single marshal request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarshalOutcome {
    /// A channel was written.
    Emitted {
        /// Name of the channel.
        channel: String,
    },
    /// The label was already marshaled this cycle; nothing was done.
    AlreadyPresent,
    /// The entry's element type is not representable; nothing was done.
    Skipped,
}

impl MarshalOutcome {
    /// Whether a channel was written.
    pub fn is_emitted(&self) -> bool {
        matches!(self, Self::Emitted { .. })
    }
}
