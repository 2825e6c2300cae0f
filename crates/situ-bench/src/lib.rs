//! Benchmark profiles for the Situ in-situ bridge.
//!
//! - [`reference_field`]: 64³ device-resident scalar field with a halo of 2
//! - [`reference_particles`]: 100K particles with two extra attributes
//! - [`DiscardBackend`]: backend that accepts everything and keeps nothing

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use situ_core::{FieldLayout, MemorySpace, SpatialRegion, UniformMesh};
use situ_engine::{Backend, BackendStatus};
use situ_graph::{GraphView, Node};
use situ_marshal::{Field, ParticleAttrib, ParticleCollection};

/// Edge length of [`reference_field`].
pub const FIELD_EDGE: usize = 64;

/// Particle count of [`reference_particles`].
pub const PARTICLE_COUNT: usize = 100_000;

/// A `FIELD_EDGE`³ scalar field with a halo of 2, resident on the device.
pub fn reference_field() -> Field<f64, 3> {
    let mut f = Field::new(
        Arc::new(UniformMesh::new([0.0; 3], [0.1; 3])),
        Arc::new(FieldLayout::from_extents([FIELD_EDGE; 3])),
        2,
        MemorySpace::Device,
    );
    f.fill(0.0);
    f.fill_owned_with(|[i, j, k]| (i * j + k) as f64);
    f
}

/// `PARTICLE_COUNT` particles on a lattice inside the unit cube, with
/// `mass` and `charge` attributes.
pub fn reference_particles(space: MemorySpace) -> ParticleCollection<3> {
    let mut p = ParticleCollection::new(space)
        .with_region(SpatialRegion::new([0.0; 3], [1.0; 3]));
    let side = (PARTICLE_COUNT as f64).cbrt().ceil() as usize;
    let step = 1.0 / side as f64;
    let mut mass = Vec::with_capacity(PARTICLE_COUNT);
    let mut charge = Vec::with_capacity(PARTICLE_COUNT);
    for n in 0..PARTICLE_COUNT {
        let (i, j, k) = (n % side, (n / side) % side, n / (side * side));
        p.push(n as i64, [i as f64 * step, j as f64 * step, k as f64 * step])
            .unwrap();
        mass.push(1.0f64);
        charge.push(if n % 2 == 0 { 1.0f32 } else { -1.0 });
    }
    p.add_attribute(ParticleAttrib::from_values("mass", &mass, space))
        .unwrap();
    p.add_attribute(ParticleAttrib::from_values("charge", &charge, space))
        .unwrap();
    p
}

/// Backend that accepts every call and ignores the graph.
#[derive(Debug, Default)]
pub struct DiscardBackend;

impl Backend for DiscardBackend {
    fn name(&self) -> &str {
        "discard"
    }

    fn initialize(&mut self, _config: &Node) -> BackendStatus {
        BackendStatus::Ok
    }

    fn execute(&mut self, view: GraphView<'_>) -> BackendStatus {
        std::hint::black_box(view.graph());
        BackendStatus::Ok
    }

    fn fetch_results(&mut self, _results: &mut Node) -> BackendStatus {
        BackendStatus::Ok
    }

    fn finalize(&mut self) -> BackendStatus {
        BackendStatus::Ok
    }
}
