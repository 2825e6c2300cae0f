//! Mesh fields.
//!
//! A [`Field`] is a block of cells on a uniform mesh: the cells this
//! process owns plus a halo of `halo` cells on every side, stored
//! row-major in a [`DeviceArray`]. [`FieldSource`] erases the element
//! type and dimensionality so fields of any kind can sit in one
//! registry.

use std::sync::Arc;

use smallvec::SmallVec;

use situ_arena::{copy_window, ArenaError, HostBuffer, HostScalar};
use situ_core::{
    for_each_index, CoreError, DType, DeviceArray, ElementKind, FieldElement, FieldLayout,
    IndexRange, MemorySpace, Scalar, UniformMesh,
};

use crate::mask::GeometryKey;

/// Type-erased view of a field for marshaling.
pub trait FieldSource {
    /// Structural kind of the per-cell element.
    fn element_kind(&self) -> ElementKind;

    /// Scalar type of each component.
    fn dtype(&self) -> DType;

    /// Number of spatial axes.
    fn dims(&self) -> usize;

    /// Mesh origin per axis.
    fn origin(&self) -> &[f64];

    /// Mesh spacing per axis.
    fn spacing(&self) -> &[f64];

    /// Locally owned global index ranges per axis.
    fn local_ranges(&self) -> &[IndexRange];

    /// Halo width in cells.
    fn halo(&self) -> usize;

    /// Copy the field to a column-major host buffer.
    ///
    /// With `include_halo` the whole allocation is copied; otherwise
    /// only the owned interior.
    fn to_host(&self, include_halo: bool) -> Result<HostBuffer, ArenaError>;

    /// Owned cell count per axis.
    fn owned_extents(&self) -> SmallVec<[usize; 3]> {
        self.local_ranges().iter().map(|r| r.len).collect()
    }

    /// Structural identity of this field's geometry.
    fn geometry_key(&self) -> GeometryKey {
        GeometryKey::new(self.origin(), self.spacing(), self.local_ranges(), self.halo())
    }
}

/// A field of `E` elements over a `D`-axis uniform mesh.
///
/// Mesh and layout are shared so many fields can describe the same
/// geometry.
#[derive(Clone, Debug)]
pub struct Field<E: FieldElement, const D: usize> {
    mesh: Arc<UniformMesh<D>>,
    layout: Arc<FieldLayout<D>>,
    halo: usize,
    data: DeviceArray<E::Scalar>,
}

impl<E: FieldElement, const D: usize> Field<E, D> {
    /// Allocate a zeroed field with a halo of `halo` cells.
    pub fn new(
        mesh: Arc<UniformMesh<D>>,
        layout: Arc<FieldLayout<D>>,
        halo: usize,
        space: MemorySpace,
    ) -> Self {
        let extents = layout.extents().map(|n| n + 2 * halo);
        Self {
            data: DeviceArray::zeros(&extents, E::COMPONENTS, space),
            mesh,
            layout,
            halo,
        }
    }

    /// The mesh.
    pub fn mesh(&self) -> &Arc<UniformMesh<D>> {
        &self.mesh
    }

    /// The layout.
    pub fn layout(&self) -> &Arc<FieldLayout<D>> {
        &self.layout
    }

    /// Allocated cells per axis, halo included.
    pub fn alloc_extents(&self) -> [usize; D] {
        self.layout.extents().map(|n| n + 2 * self.halo)
    }

    /// Raw storage.
    pub fn data(&self) -> &DeviceArray<E::Scalar> {
        &self.data
    }

    /// Mutable raw storage.
    pub fn data_mut(&mut self) -> &mut DeviceArray<E::Scalar> {
        &mut self.data
    }

    /// Element at an allocation index (halo cells start at 0).
    pub fn get(&self, index: [usize; D]) -> Option<E> {
        let mut comps: SmallVec<[E::Scalar; 4]> = SmallVec::with_capacity(E::COMPONENTS);
        for c in 0..E::COMPONENTS {
            comps.push(self.data.get(&index, c)?);
        }
        Some(E::from_components(&comps))
    }

    /// Overwrite the element at an allocation index.
    pub fn set(&mut self, index: [usize; D], value: E) -> Result<(), CoreError> {
        for c in 0..E::COMPONENTS {
            self.data.set(&index, c, value.component(c))?;
        }
        Ok(())
    }

    /// Set every cell, halo included.
    pub fn fill(&mut self, value: E) {
        for chunk in self.data.as_mut_slice().chunks_mut(E::COMPONENTS) {
            for (c, slot) in chunk.iter_mut().enumerate() {
                *slot = value.component(c);
            }
        }
    }

    /// Set every owned cell from `f`, called with the owned index
    /// (0-based, halo excluded). Halo cells are left untouched.
    pub fn fill_owned_with(&mut self, mut f: impl FnMut([usize; D]) -> E) {
        let owned = self.layout.extents();
        let halo = self.halo;
        let comps = E::COMPONENTS;
        let alloc = self.alloc_extents();
        let data = self.data.as_mut_slice();
        for_each_index(&owned, |idx| {
            let mut owned_idx = [0usize; D];
            owned_idx.copy_from_slice(idx);
            let offset = idx
                .iter()
                .zip(alloc.iter())
                .fold(0, |acc, (&i, &e)| acc * e + i + halo);
            let value = f(owned_idx);
            for c in 0..comps {
                data[offset * comps + c] = value.component(c);
            }
        });
    }
}

impl<E, const D: usize> FieldSource for Field<E, D>
where
    E: FieldElement,
    E::Scalar: HostScalar,
{
    fn element_kind(&self) -> ElementKind {
        E::KIND
    }

    fn dtype(&self) -> DType {
        <E::Scalar as Scalar>::DTYPE
    }

    fn dims(&self) -> usize {
        D
    }

    fn origin(&self) -> &[f64] {
        self.mesh.origin()
    }

    fn spacing(&self) -> &[f64] {
        self.mesh.spacing()
    }

    fn local_ranges(&self) -> &[IndexRange] {
        self.layout.local()
    }

    fn halo(&self) -> usize {
        self.halo
    }

    fn to_host(&self, include_halo: bool) -> Result<HostBuffer, ArenaError> {
        if include_halo {
            return copy_window(&self.data, None);
        }
        let h = self.halo;
        let window: SmallVec<[std::ops::Range<usize>; 3]> =
            self.layout.extents().iter().map(|&n| h..h + n).collect();
        copy_window(&self.data, Some(window.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use situ_core::Vector;

    fn cube(n: usize, halo: usize) -> Field<f64, 3> {
        Field::new(
            Arc::new(UniformMesh::unit()),
            Arc::new(FieldLayout::from_extents([n, n, n])),
            halo,
            MemorySpace::Device,
        )
    }

    #[test]
    fn allocation_includes_halo() {
        let f = cube(4, 1);
        assert_eq!(f.alloc_extents(), [6, 6, 6]);
        assert_eq!(f.data().element_count(), 216);
        assert_eq!(f.owned_extents().as_slice(), &[4, 4, 4]);
    }

    #[test]
    fn fill_owned_leaves_halo() {
        let mut f = cube(2, 1);
        f.fill(-1.0);
        f.fill_owned_with(|[i, j, k]| (i * 100 + j * 10 + k) as f64);
        assert_eq!(f.get([0, 0, 0]), Some(-1.0));
        assert_eq!(f.get([1, 1, 1]), Some(0.0));
        assert_eq!(f.get([2, 1, 2]), Some(101.0));
        assert_eq!(f.get([3, 3, 3]), Some(-1.0));
    }

    #[test]
    fn host_copy_strips_halo() {
        let mut f = cube(2, 1);
        f.fill(-1.0);
        f.fill_owned_with(|[i, j, k]| (i * 100 + j * 10 + k) as f64);
        let host = f.to_host(false).unwrap();
        assert_eq!(host.extents(), &[2, 2, 2]);
        assert!(host.as_slice::<f64>().unwrap().iter().all(|&v| v >= 0.0));
        assert_eq!(host.get::<f64>(&[1, 0, 1], 0), Some(101.0));

        let full = f.to_host(true).unwrap();
        assert_eq!(full.extents(), &[4, 4, 4]);
        assert_eq!(full.get::<f64>(&[2, 1, 2], 0), Some(101.0));
    }

    #[test]
    fn vector_field_round_trips_elements() {
        let mut f: Field<Vector<f32, 2>, 2> = Field::new(
            Arc::new(UniformMesh::unit()),
            Arc::new(FieldLayout::from_extents([3, 2])),
            0,
            MemorySpace::Host,
        );
        f.set([2, 1], Vector::new([1.5, -2.0])).unwrap();
        assert_eq!(f.get([2, 1]), Some(Vector::new([1.5, -2.0])));
        assert_eq!(f.element_kind(), ElementKind::Vector { components: 2 });
        assert_eq!(f.dtype(), DType::F32);
        assert!(f.set([3, 0], Vector::default()).is_err());
    }

    #[test]
    fn geometry_key_reflects_layout() {
        let a = cube(4, 1);
        let b = cube(4, 1);
        let c = cube(4, 2);
        assert_eq!(a.geometry_key(), b.geometry_key());
        assert_ne!(a.geometry_key(), c.geometry_key());
    }
}
