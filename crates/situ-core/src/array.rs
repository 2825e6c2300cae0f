//! Compute-memory array storage.
//!
//! [`DeviceArray`] models the storage a simulation keeps its state in:
//! a flat run of scalars in row-major order (last axis fastest) with the
//! components of each element stored contiguously. The backing `Vec` is
//! reference counted so host-resident arrays can be shared with the
//! exchange graph without copying; mutation goes through
//! [`Arc::make_mut`], which detaches any outstanding shares first.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::element::Scalar;
use crate::error::CoreError;

/// Where an array's data lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemorySpace {
    /// Host memory, directly addressable by the analysis backend.
    Host,
    /// Accelerator memory; every host view requires a transfer.
    Device,
}

/// Row-major multi-axis array of scalars with interleaved components.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceArray<S> {
    data: Arc<Vec<S>>,
    extents: SmallVec<[usize; 4]>,
    components: usize,
    space: MemorySpace,
}

impl<S: Scalar> DeviceArray<S> {
    /// Allocate an array filled with `S::default()`.
    pub fn zeros(extents: &[usize], components: usize, space: MemorySpace) -> Self {
        Self::filled(extents, components, S::default(), space)
    }

    /// Allocate an array with every scalar set to `value`.
    pub fn filled(extents: &[usize], components: usize, value: S, space: MemorySpace) -> Self {
        let count = extents.iter().product::<usize>() * components;
        Self {
            data: Arc::new(vec![value; count]),
            extents: extents.iter().copied().collect(),
            components,
            space,
        }
    }

    /// Wrap existing row-major data.
    ///
    /// Returns [`CoreError::ShapeMismatch`] if `data.len()` is not
    /// `product(extents) * components`.
    pub fn from_vec(
        data: Vec<S>,
        extents: &[usize],
        components: usize,
        space: MemorySpace,
    ) -> Result<Self, CoreError> {
        let expected = extents.iter().product::<usize>() * components;
        if data.len() != expected {
            return Err(CoreError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data: Arc::new(data),
            extents: extents.iter().copied().collect(),
            components,
            space,
        })
    }

    /// Extent of each axis.
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    /// Scalars per element.
    pub fn components(&self) -> usize {
        self.components
    }

    /// Memory space the data lives in.
    pub fn space(&self) -> MemorySpace {
        self.space
    }

    /// Number of elements (product of extents).
    pub fn element_count(&self) -> usize {
        self.extents.iter().product()
    }

    /// Number of scalars.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the array holds no scalars.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat row-major scalars.
    pub fn as_slice(&self) -> &[S] {
        &self.data
    }

    /// Mutable flat scalars. Detaches from any shared host view.
    pub fn as_mut_slice(&mut self) -> &mut [S] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// The shared backing storage.
    pub fn shared(&self) -> &Arc<Vec<S>> {
        &self.data
    }

    /// Row-major element offset of a multi-index.
    pub fn offset(&self, index: &[usize]) -> Result<usize, CoreError> {
        if index.len() != self.extents.len() {
            return Err(CoreError::ShapeMismatch {
                expected: self.extents.len(),
                actual: index.len(),
            });
        }
        let mut offset = 0;
        for (axis, (&i, &extent)) in index.iter().zip(self.extents.iter()).enumerate() {
            if i >= extent {
                return Err(CoreError::IndexOutOfBounds {
                    axis,
                    index: i,
                    extent,
                });
            }
            offset = offset * extent + i;
        }
        Ok(offset)
    }

    /// Component `c` of the element at `index`, if in bounds.
    pub fn get(&self, index: &[usize], c: usize) -> Option<S> {
        if c >= self.components {
            return None;
        }
        let offset = self.offset(index).ok()?;
        self.data.get(offset * self.components + c).copied()
    }

    /// Overwrite component `c` of the element at `index`.
    pub fn set(&mut self, index: &[usize], c: usize, value: S) -> Result<(), CoreError> {
        if c >= self.components {
            return Err(CoreError::IndexOutOfBounds {
                axis: self.extents.len(),
                index: c,
                extent: self.components,
            });
        }
        let offset = self.offset(index)?;
        let components = self.components;
        self.as_mut_slice()[offset * components + c] = value;
        Ok(())
    }

    /// Set every scalar to `value`.
    pub fn fill(&mut self, value: S) {
        self.as_mut_slice().fill(value);
    }

    /// Append one element to a single-axis array.
    pub fn push_element(&mut self, components: &[S]) -> Result<(), CoreError> {
        if self.extents.len() != 1 {
            return Err(CoreError::UnsupportedDimensionality {
                dims: self.extents.len(),
                max: 1,
            });
        }
        if components.len() != self.components {
            return Err(CoreError::ShapeMismatch {
                expected: self.components,
                actual: components.len(),
            });
        }
        Arc::make_mut(&mut self.data).extend_from_slice(components);
        self.extents[0] += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_has_expected_len() {
        let a: DeviceArray<f64> = DeviceArray::zeros(&[2, 3, 4], 2, MemorySpace::Device);
        assert_eq!(a.element_count(), 24);
        assert_eq!(a.len(), 48);
        assert_eq!(a.rank(), 3);
    }

    #[test]
    fn from_vec_rejects_bad_shape() {
        let err = DeviceArray::from_vec(vec![1.0f32; 5], &[2, 3], 1, MemorySpace::Host).unwrap_err();
        assert_eq!(
            err,
            CoreError::ShapeMismatch {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn row_major_offsets() {
        let a: DeviceArray<i32> = DeviceArray::zeros(&[2, 3], 1, MemorySpace::Host);
        assert_eq!(a.offset(&[0, 0]).unwrap(), 0);
        assert_eq!(a.offset(&[0, 2]).unwrap(), 2);
        assert_eq!(a.offset(&[1, 0]).unwrap(), 3);
        assert!(matches!(
            a.offset(&[2, 0]),
            Err(CoreError::IndexOutOfBounds { axis: 0, .. })
        ));
    }

    #[test]
    fn set_and_get_components() {
        let mut a: DeviceArray<f32> = DeviceArray::zeros(&[2, 2], 3, MemorySpace::Device);
        a.set(&[1, 0], 2, 7.5).unwrap();
        assert_eq!(a.get(&[1, 0], 2), Some(7.5));
        assert_eq!(a.as_slice()[(2 * 3) + 2], 7.5);
        assert_eq!(a.get(&[1, 0], 3), None);
    }

    #[test]
    fn mutation_detaches_shared_storage() {
        let mut a = DeviceArray::from_vec(vec![1u8, 2, 3], &[3], 1, MemorySpace::Host).unwrap();
        let shared = Arc::clone(a.shared());
        a.set(&[0], 0, 9).unwrap();
        assert_eq!(shared.as_slice(), &[1, 2, 3]);
        assert_eq!(a.as_slice(), &[9, 2, 3]);
    }

    #[test]
    fn push_element_grows_single_axis() {
        let mut a: DeviceArray<f64> = DeviceArray::zeros(&[0], 2, MemorySpace::Host);
        a.push_element(&[1.0, 2.0]).unwrap();
        a.push_element(&[3.0, 4.0]).unwrap();
        assert_eq!(a.extents(), &[2]);
        assert_eq!(a.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert!(a.push_element(&[1.0]).is_err());
    }
}
