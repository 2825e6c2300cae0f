//! Situ: an in-situ bridge between a running simulation and an analysis
//! backend.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Situ sub-crates. Most users only need `situ` as a dependency.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use situ::graph::{GraphView, Node};
//! use situ::prelude::*;
//!
//! // A backend that accepts every graph and does nothing with it.
//! struct Discard;
//! impl Backend for Discard {
//!     fn name(&self) -> &str { "discard" }
//!     fn initialize(&mut self, _config: &Node) -> BackendStatus { BackendStatus::Ok }
//!     fn execute(&mut self, _view: GraphView<'_>) -> BackendStatus { BackendStatus::Ok }
//!     fn fetch_results(&mut self, _results: &mut Node) -> BackendStatus { BackendStatus::Ok }
//!     fn finalize(&mut self) -> BackendStatus { BackendStatus::Ok }
//! }
//!
//! // An 8×8 scalar field with one halo cell on every side.
//! let mut rho: Field<f64, 2> = Field::new(
//!     Arc::new(UniformMesh::unit()),
//!     Arc::new(FieldLayout::from_extents([8, 8])),
//!     1,
//!     MemorySpace::Host,
//! );
//! rho.fill_owned_with(|[i, j]| (i + j) as f64);
//!
//! let mut vis = EntryRegistry::new();
//! vis.add_field("rho", &rho);
//! let mut steer = EntryRegistry::new();
//!
//! let mut orch = CycleOrchestrator::new(AdaptorConfig::default(), Discard);
//! orch.initialize(&mut vis, &mut steer)?;
//! let metrics = orch.execute(0, 0.0, 0, &mut vis, &mut steer)?;
//! assert_eq!(metrics.channels, 1);
//! assert!(orch.finalize().is_ok());
//! # Ok::<(), situ::engine::AdaptorError>(())
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `situ-core` | Labels, element types, geometry, device arrays |
//! | [`arena`] | `situ-arena` | Host buffers and the per-cycle buffer registry |
//! | [`graph`] | `situ-graph` | The hierarchical exchange graph and its views |
//! | [`marshal`] | `situ-marshal` | Entry registry, marshalers, ghost masks, steering |
//! | [`engine`] | `situ-engine` | Configuration, backends and the cycle orchestrator |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`situ-core`).
///
/// Labels, [`types::FieldElement`] element descriptions, uniform meshes
/// and layouts, and [`types::DeviceArray`] storage.
pub use situ_core as types;

/// Host buffers and the buffer registry (`situ-arena`).
pub use situ_arena as arena;

/// The exchange graph (`situ-graph`).
///
/// [`graph::Node`] trees reference registry buffers through
/// [`graph::ExternalArray`]s; a [`graph::GraphView`] resolves them.
pub use situ_graph as graph;

/// Marshaling of fields, particles and steerable scalars (`situ-marshal`).
pub use situ_marshal as marshal;

/// Configuration, backends and cycle orchestration (`situ-engine`).
pub use situ_engine as engine;

/// Common imports for typical Situ usage.
///
/// ```rust
/// use situ::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use situ_core::{
        DeviceArray, FieldLayout, IndexRange, Label, MemorySpace, SpatialRegion, UniformMesh,
        Vector,
    };

    // Marshaling
    pub use situ_marshal::{
        Attribute, EntryRegistry, Field, FieldSource, ParticleAttrib, ParticleCollection,
        ParticleSource, ScalarSlot,
    };

    // Errors
    pub use situ_marshal::{MarshalError, SteeringError};

    // Engine
    pub use situ_engine::{
        AdaptorConfig, AdaptorError, Backend, BackendStatus, CycleMetrics, CycleOrchestrator,
        MaskCachePolicy,
    };
}
