//! Marshaling of simulation state into the Situ exchange graph.
//!
//! Simulation entities are registered by label in an [`EntryRegistry`]
//! as one of three categories: a steerable [scalar](ScalarSlot), a
//! [particle collection](ParticleSource), or a [field](FieldSource).
//! Visitors walk the registry and hand each entry to the matching
//! marshaler:
//!
//! - [`FieldMarshaler`] writes a uniform mesh channel, copies the field
//!   to the host (stripping the halo, or exporting it with a
//!   [ghost mask](GhostMaskCache)) and references the copy from the graph.
//! - [`ParticleMarshaler`] writes an explicit point-cloud channel from
//!   identifier and position arrays, plus any extra attributes.
//! - [`steering`] pushes scalars into forward channels and pulls updated
//!   values back out of the backend's results.
//!
//! Marshaling a label is idempotent within a cycle: once a label has
//! buffers in the [`BufferRegistry`](situ_arena::BufferRegistry), later
//! requests for it are no-ops.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod context;
pub mod entry;
pub mod error;
pub mod field;
pub mod field_marshal;
pub mod mask;
pub mod particle;
pub mod particle_marshal;
pub mod registry;
pub mod steering;

pub use channel::ChannelKind;
pub use context::{MarshalContext, MarshalOutcome};
pub use entry::{Entry, EntryCategory, ScalarSlot};
pub use error::{MarshalError, SteeringError};
pub use field::{Field, FieldSource};
pub use field_marshal::FieldMarshaler;
pub use mask::{build_ghost_mask, GeometryKey, GhostMaskCache};
pub use particle::{Attribute, ParticleAttrib, ParticleCollection, ParticleSource};
pub use particle_marshal::ParticleMarshaler;
pub use registry::{EntryRegistry, EntryVisitor};
pub use steering::SteerTarget;
