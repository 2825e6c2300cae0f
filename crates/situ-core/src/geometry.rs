//! Uniform mesh geometry and per-process index layouts.

/// Largest number of spatial axes the exchange graph can describe.
pub const MAX_AXES: usize = 3;

/// A contiguous run of global cell indices on one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexRange {
    /// First global index owned.
    pub first: i64,
    /// Number of indices owned.
    pub len: usize,
}

impl IndexRange {
    /// Create a range starting at `first` covering `len` indices.
    pub fn new(first: i64, len: usize) -> Self {
        Self { first, len }
    }

    /// One past the last global index.
    pub fn end(&self) -> i64 {
        self.first + self.len as i64
    }
}

/// A uniform Cartesian mesh: origin and cell spacing per axis.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformMesh<const D: usize> {
    origin: [f64; D],
    spacing: [f64; D],
}

impl<const D: usize> UniformMesh<D> {
    /// Create a mesh from its origin and spacing.
    pub fn new(origin: [f64; D], spacing: [f64; D]) -> Self {
        Self { origin, spacing }
    }

    /// A mesh with unit spacing anchored at the origin.
    pub fn unit() -> Self {
        Self {
            origin: [0.0; D],
            spacing: [1.0; D],
        }
    }

    /// Physical coordinate of global index 0 on each axis.
    pub fn origin(&self) -> &[f64; D] {
        &self.origin
    }

    /// Cell width on each axis.
    pub fn spacing(&self) -> &[f64; D] {
        &self.spacing
    }
}

/// The portion of a global index space owned by this process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout<const D: usize> {
    local: [IndexRange; D],
}

impl<const D: usize> FieldLayout<D> {
    /// Create a layout from the locally owned range on each axis.
    pub fn new(local: [IndexRange; D]) -> Self {
        Self { local }
    }

    /// A layout owning `[0, extents[a])` on every axis.
    pub fn from_extents(extents: [usize; D]) -> Self {
        Self {
            local: extents.map(|n| IndexRange::new(0, n)),
        }
    }

    /// Locally owned ranges.
    pub fn local(&self) -> &[IndexRange; D] {
        &self.local
    }

    /// Owned cell count per axis.
    pub fn extents(&self) -> [usize; D] {
        self.local.map(|r| r.len)
    }
}

/// Axis-aligned bounding box of a spatial region.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialRegion<const D: usize> {
    /// Lower corner.
    pub min: [f64; D],
    /// Upper corner.
    pub max: [f64; D],
}

impl<const D: usize> SpatialRegion<D> {
    /// Create a region from its corners.
    pub fn new(min: [f64; D], max: [f64; D]) -> Self {
        Self { min, max }
    }

    /// Edge length on each axis (`max - min`).
    pub fn extent(&self) -> [f64; D] {
        let mut out = [0.0; D];
        for (a, slot) in out.iter_mut().enumerate() {
            *slot = self.max[a] - self.min[a];
        }
        out
    }
}

/// Call `f` with every multi-index of `extents` in row-major order.
///
/// Does nothing if any extent is zero. A zero-axis shape visits the
/// single empty index once.
pub fn for_each_index(extents: &[usize], mut f: impl FnMut(&[usize])) {
    if extents.iter().any(|&e| e == 0) {
        return;
    }
    let mut idx = vec![0usize; extents.len()];
    loop {
        f(&idx);
        let mut axis = extents.len();
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            idx[axis] += 1;
            if idx[axis] < extents[axis] {
                break;
            }
            idx[axis] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_range_end() {
        let r = IndexRange::new(4, 8);
        assert_eq!(r.end(), 12);
    }

    #[test]
    fn layout_extents() {
        let layout = FieldLayout::new([IndexRange::new(2, 4), IndexRange::new(0, 5)]);
        assert_eq!(layout.extents(), [4, 5]);
        assert_eq!(FieldLayout::from_extents([3, 3]).local()[1], IndexRange::new(0, 3));
    }

    #[test]
    fn region_extent() {
        let r = SpatialRegion::new([0.0, -1.0], [2.0, 1.0]);
        assert_eq!(r.extent(), [2.0, 2.0]);
    }

    #[test]
    fn for_each_index_is_row_major() {
        let mut seen = Vec::new();
        for_each_index(&[2, 3], |i| seen.push((i[0], i[1])));
        assert_eq!(seen, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);

        let mut count = 0;
        for_each_index(&[4, 0, 2], |_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn unit_mesh() {
        let m: UniformMesh<3> = UniformMesh::unit();
        assert_eq!(m.origin(), &[0.0; 3]);
        assert_eq!(m.spacing(), &[1.0; 3]);
    }
}
