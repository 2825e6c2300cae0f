//! Reusable fields, particle clouds and script directories.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use situ_core::{FieldLayout, IndexRange, MemorySpace, SpatialRegion, UniformMesh, Vector};
use situ_engine::AdaptorConfig;
use situ_marshal::{Field, ParticleAttrib, ParticleCollection};

/// Proxy template written by [`proxy_script_dir`].
pub const PROXY_TEMPLATE_TEXT: &str = r#"<ServerManagerConfiguration>
  <ProxyGroup name="sources">
    <SourceProxy name="steer_EXAMPLE" class="vtkSteeringDataGenerator">
      <DoubleVectorProperty name="EXAMPLE" command="SetTuple1" number_of_elements="1"/>
    </SourceProxy>
  </ProxyGroup>
</ServerManagerConfiguration>
"#;

/// An `n`³ scalar field of `f64` with a halo of `halo` cells.
///
/// Owned cell `(i, j, k)` holds `100 i + 10 j + k`; halo cells hold
/// `-1`. Unit spacing, origin at zero, device resident.
pub fn scalar_cube(n: usize, halo: usize) -> Field<f64, 3> {
    let mut f = Field::new(
        Arc::new(UniformMesh::unit()),
        Arc::new(FieldLayout::from_extents([n, n, n])),
        halo,
        MemorySpace::Device,
    );
    f.fill(-1.0);
    f.fill_owned_with(|[i, j, k]| (100 * i + 10 * j + k) as f64);
    f
}

/// A 2-axis vector field whose owned block starts at global index
/// `(first, 0)`. Cell `(i, j)` holds `(i, j)`.
pub fn vector_plane(nx: usize, ny: usize, first: i64) -> Field<Vector<f64, 2>, 2> {
    let mut f = Field::new(
        Arc::new(UniformMesh::new([0.0, 0.0], [0.5, 0.5])),
        Arc::new(FieldLayout::new([
            IndexRange::new(first, nx),
            IndexRange::new(0, ny),
        ])),
        0,
        MemorySpace::Device,
    );
    f.fill_owned_with(|[i, j]| Vector::new([i as f64, j as f64]));
    f
}

/// `n` particles on the diagonal of the unit cube, ids `0..n`, with a
/// scalar `charge` attribute and the cube as the layout region.
pub fn particle_cloud(n: usize, space: MemorySpace) -> ParticleCollection<3> {
    let mut p = ParticleCollection::new(space)
        .with_region(SpatialRegion::new([0.0; 3], [1.0; 3]));
    let step = if n > 1 { 1.0 / (n - 1) as f64 } else { 0.0 };
    let mut charge = Vec::with_capacity(n);
    for i in 0..n {
        let x = i as f64 * step;
        p.push(i as i64, [x, x, x])
            .expect("1-axis attribute push cannot fail");
        charge.push(if i % 2 == 0 { 1.0f64 } else { -1.0 });
    }
    p.add_attribute(ParticleAttrib::from_values("charge", &charge, space))
        .expect("one charge per particle");
    p
}

/// A temporary script directory holding the proxy template.
pub fn proxy_script_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join(AdaptorConfig::PROXY_TEMPLATE), PROXY_TEMPLATE_TEXT)
        .expect("write proxy template");
    dir
}
