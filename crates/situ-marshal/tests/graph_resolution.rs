//! Marshaled fields and particles resolve back to the simulation's values
//! through a graph view.

use std::sync::Arc;

use proptest::prelude::*;
use situ_arena::BufferRegistry;
use situ_core::{FieldLayout, Label, MemorySpace, UniformMesh, Vector};
use situ_graph::{GraphView, Node, Value};
use situ_marshal::{
    EntryRegistry, EntryVisitor, Field, FieldMarshaler, FieldSource, GhostMaskCache,
    MarshalContext, MarshalError, ParticleAttrib, ParticleCollection, ParticleMarshaler,
    ParticleSource,
};

fn plane(nx: usize, ny: usize, halo: usize) -> Field<f64, 2> {
    let mut f = Field::new(
        Arc::new(UniformMesh::unit()),
        Arc::new(FieldLayout::from_extents([nx, ny])),
        halo,
        MemorySpace::Device,
    );
    f.fill(-1.0);
    f.fill_owned_with(|[i, j]| (100 * i + j) as f64);
    f
}

fn resolved(view: &GraphView<'_>, path: &str) -> Vec<f64> {
    match view.values(path).unwrap() {
        Value::Array(data) => data.to_f64_vec(),
        other => panic!("expected array at {path}, found {}", other.kind_name()),
    }
}

struct Publish<'c> {
    ctx: MarshalContext<'c>,
    fields: FieldMarshaler,
    particles: ParticleMarshaler,
}

impl EntryVisitor for Publish<'_> {
    type Error = MarshalError;

    fn visit_field(&mut self, label: &Label, field: &dyn FieldSource) -> Result<(), MarshalError> {
        self.fields.marshal(&mut self.ctx, label, field).map(|_| ())
    }

    fn visit_particles(
        &mut self,
        label: &Label,
        particles: &dyn ParticleSource,
    ) -> Result<(), MarshalError> {
        self.particles
            .marshal(&mut self.ctx, label, particles, false)
            .map(|_| ())
    }
}

proptest! {
    #[test]
    fn stripped_field_is_owned_block_column_major(
        nx in 1usize..6,
        ny in 1usize..6,
        halo in 0usize..3,
    ) {
        let field = plane(nx, ny, halo);
        let (mut graph, mut buffers, mut masks) =
            (Node::new(), BufferRegistry::new(), GhostMaskCache::new());
        let mut ctx = MarshalContext::new(&mut graph, &mut buffers, &mut masks);
        FieldMarshaler::new(false)
            .marshal(&mut ctx, &Label::from("f"), &field)
            .unwrap();
        buffers.fence();
        let view = GraphView::new(&graph, &buffers).unwrap();
        let values = resolved(&view, "insitu/channels/sfield_f/data/fields/f/values");
        prop_assert_eq!(values.len(), nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                prop_assert_eq!(values[i + nx * j], (100 * i + j) as f64);
            }
        }
    }

    #[test]
    fn ghost_export_pairs_values_with_mask(
        nx in 1usize..5,
        ny in 1usize..5,
        halo in 1usize..3,
    ) {
        let field = plane(nx, ny, halo);
        let (mut graph, mut buffers, mut masks) =
            (Node::new(), BufferRegistry::new(), GhostMaskCache::new());
        let mut ctx = MarshalContext::new(&mut graph, &mut buffers, &mut masks);
        FieldMarshaler::new(true)
            .marshal(&mut ctx, &Label::from("f"), &field)
            .unwrap();
        buffers.fence();
        let view = GraphView::new(&graph, &buffers).unwrap();
        let data = "insitu/channels/sfield_f/data/fields";
        let values = resolved(&view, &format!("{data}/f/values"));
        let mask = resolved(&view, &format!("{data}/vtkGhostType/values"));
        let (fx, fy) = (nx + 2 * halo, ny + 2 * halo);
        prop_assert_eq!(values.len(), fx * fy);
        prop_assert_eq!(mask.len(), fx * fy);
        for n in 0..fx * fy {
            if mask[n] == 0.0 {
                prop_assert!(values[n] >= 0.0);
            } else {
                prop_assert_eq!(values[n], -1.0);
            }
        }
    }
}

#[test]
fn vector_components_resolve_separately() {
    let mut e: Field<Vector<f64, 3>, 2> = Field::new(
        Arc::new(UniformMesh::unit()),
        Arc::new(FieldLayout::from_extents([3, 2])),
        1,
        MemorySpace::Host,
    );
    e.fill_owned_with(|[i, j]| Vector::new([i as f64, j as f64, -1.0]));
    let (mut graph, mut buffers, mut masks) =
        (Node::new(), BufferRegistry::new(), GhostMaskCache::new());
    let mut ctx = MarshalContext::new(&mut graph, &mut buffers, &mut masks);
    FieldMarshaler::new(false)
        .marshal(&mut ctx, &Label::from("E"), &e)
        .unwrap();
    buffers.fence();
    let view = GraphView::new(&graph, &buffers).unwrap();
    let values = "insitu/channels/vfield_E/data/fields/E/values";
    assert_eq!(resolved(&view, &format!("{values}/x")), [0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
    assert_eq!(resolved(&view, &format!("{values}/y")), [0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    assert_eq!(resolved(&view, &format!("{values}/z")), [-1.0; 6]);
}

#[test]
fn registry_walk_publishes_every_entry_once() {
    let rho = plane(4, 4, 1);
    let mut ions = ParticleCollection::<2>::new(MemorySpace::Host);
    for n in 0..5 {
        ions.push(10 + n, [n as f64, 2.0 * n as f64]).unwrap();
    }
    ions.add_attribute(ParticleAttrib::from_values(
        "mass",
        &[1.0f64, 2.0, 3.0, 4.0, 5.0],
        MemorySpace::Host,
    ))
    .unwrap();

    let mut entries = EntryRegistry::new();
    entries.add_field("rho", &rho);
    entries.add_particles("ions", &ions);

    let (mut graph, mut buffers, mut masks) =
        (Node::new(), BufferRegistry::new(), GhostMaskCache::new());
    let mut publish = Publish {
        ctx: MarshalContext::new(&mut graph, &mut buffers, &mut masks),
        fields: FieldMarshaler::new(false),
        particles: ParticleMarshaler::new(),
    };
    entries.for_each(&mut publish).unwrap();
    // A second walk in the same cycle adds nothing.
    entries.for_each(&mut publish).unwrap();
    drop(publish);

    assert_eq!(buffers.label_count(), 2);
    buffers.fence();
    let view = GraphView::new(&graph, &buffers).unwrap();
    let ions_data = "insitu/channels/particles_ions/data";
    assert_eq!(
        resolved(&view, &format!("{ions_data}/coordsets/p_coords/values/y")),
        [0.0, 2.0, 4.0, 6.0, 8.0]
    );
    assert_eq!(
        resolved(&view, &format!("{ions_data}/topologies/p_topo/elements/connectivity")),
        [10.0, 11.0, 12.0, 13.0, 14.0]
    );
    assert_eq!(
        resolved(&view, &format!("{ions_data}/fields/mass/values")),
        [1.0, 2.0, 3.0, 4.0, 5.0]
    );
    assert_eq!(view.externals().iter().filter(|(p, _)| p.contains("sfield_rho")).count(), 1);
}
