//! Ghost mask construction and caching.
//!
//! A ghost mask marks every cell of a field's full allocation as owned
//! (`0`) or halo (`1`). It depends only on geometry, so it is cached by
//! a structural [`GeometryKey`]: two fields over identical meshes,
//! layouts and halo widths share one mask buffer.
//!
//! The cache does not key on object identity. A layout that is dropped
//! and rebuilt with the same ranges maps to the same key, and a layout
//! whose ranges change maps to a new one, so there is no stale-address
//! hazard.

use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use situ_arena::{copy_window, HostBuffer};
use situ_core::{for_each_index, CoreError, DeviceArray, IndexRange, MemorySpace, MAX_AXES};

use crate::error::MarshalError;

/// Structural identity of a field's geometry.
///
/// Floats are compared by bit pattern, so `0.0` and `-0.0` are distinct
/// keys. Both produce the same mask; the cost is one redundant entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeometryKey {
    origin: SmallVec<[u64; 3]>,
    spacing: SmallVec<[u64; 3]>,
    ranges: SmallVec<[IndexRange; 3]>,
    halo: usize,
}

impl GeometryKey {
    /// Build a key from mesh, layout and halo width.
    pub fn new(origin: &[f64], spacing: &[f64], ranges: &[IndexRange], halo: usize) -> Self {
        Self {
            origin: origin.iter().map(|v| v.to_bits()).collect(),
            spacing: spacing.iter().map(|v| v.to_bits()).collect(),
            ranges: ranges.iter().copied().collect(),
            halo,
        }
    }

    /// Number of axes.
    pub fn dims(&self) -> usize {
        self.ranges.len()
    }

    /// Owned cell count per axis.
    pub fn owned_extents(&self) -> SmallVec<[usize; 3]> {
        self.ranges.iter().map(|r| r.len).collect()
    }

    /// Halo width.
    pub fn halo(&self) -> usize {
        self.halo
    }
}

/// Build the ghost mask for a field with `owned` cells per axis and a
/// halo of `halo` cells on every side.
///
/// The mask covers `owned[a] + 2 * halo` cells per axis, is `1`
/// everywhere except the owned block `[halo, halo + owned[a])`, and is
/// returned in column-major host order. Supports 1 to 3 axes.
pub fn build_ghost_mask(owned: &[usize], halo: usize) -> Result<HostBuffer, MarshalError> {
    let dims = owned.len();
    if dims == 0 || dims > MAX_AXES {
        return Err(CoreError::UnsupportedDimensionality {
            dims,
            max: MAX_AXES,
        }
        .into());
    }
    let full: SmallVec<[usize; 3]> = owned.iter().map(|n| n + 2 * halo).collect();
    let mut mask = DeviceArray::<u8>::filled(&full, 1, 1, MemorySpace::Device);

    let mut at: SmallVec<[usize; 3]> = SmallVec::from_elem(0, dims);
    let mut result = Ok(());
    for_each_index(owned, |idx| {
        if result.is_err() {
            return;
        }
        for (slot, &i) in at.iter_mut().zip(idx) {
            *slot = i + halo;
        }
        result = mask.set(&at, 0, 0);
    });
    result?;

    Ok(copy_window(&mask, None)?)
}

/// Counters describing cache behaviour since creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaskCacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that ran the producer.
    pub misses: u64,
    /// Masks currently held.
    pub entries: usize,
}

/// Geometry-keyed cache of ghost masks.
///
/// Masks are shared as `Arc<HostBuffer>`: the cache and the buffer
/// registry each hold a reference, so clearing the registry at the end
/// of a cycle does not evict the cached mask.
#[derive(Debug, Default)]
pub struct GhostMaskCache {
    masks: IndexMap<GeometryKey, Arc<HostBuffer>>,
    hits: u64,
    misses: u64,
}

impl GhostMaskCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the mask for `key`, running `producer` only on a miss.
    ///
    /// A failing producer leaves the cache unchanged.
    pub fn get_or_create<F, E>(&mut self, key: GeometryKey, producer: F) -> Result<Arc<HostBuffer>, E>
    where
        F: FnOnce() -> Result<HostBuffer, E>,
    {
        if let Some(mask) = self.masks.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(mask));
        }
        let mask = Arc::new(producer()?);
        self.misses += 1;
        self.masks.insert(key, Arc::clone(&mask));
        Ok(mask)
    }

    /// Whether a mask for `key` is cached.
    pub fn contains(&self, key: &GeometryKey) -> bool {
        self.masks.contains_key(key)
    }

    /// Evict every mask.
    pub fn clear(&mut self) {
        self.masks.clear();
    }

    /// Number of cached masks.
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Hit, miss and entry counts.
    pub fn stats(&self) -> MaskCacheStats {
        MaskCacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.masks.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(n: usize, halo: usize) -> GeometryKey {
        GeometryKey::new(
            &[0.0, 0.0, 0.0],
            &[1.0, 1.0, 1.0],
            &[IndexRange::new(0, n); 3],
            halo,
        )
    }

    #[test]
    fn hit_returns_same_buffer_without_producer() {
        let mut cache = GhostMaskCache::new();
        let first = cache
            .get_or_create(key(4, 1), || build_ghost_mask(&[4, 4, 4], 1))
            .unwrap();
        let second = cache
            .get_or_create::<_, MarshalError>(key(4, 1), || panic!("producer must not run on a hit"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            MaskCacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn distinct_geometry_gets_distinct_masks() {
        let mut cache = GhostMaskCache::new();
        let a = cache
            .get_or_create(key(4, 1), || build_ghost_mask(&[4, 4, 4], 1))
            .unwrap();
        let b = cache
            .get_or_create(key(4, 2), || build_ghost_mask(&[4, 4, 4], 2))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(&key(4, 1)));
    }

    #[test]
    fn failing_producer_caches_nothing() {
        let mut cache = GhostMaskCache::new();
        let err = cache.get_or_create(key(2, 0), || build_ghost_mask(&[2, 2, 2, 2], 0));
        assert!(err.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn structurally_equal_keys_match() {
        let a = GeometryKey::new(&[0.5], &[0.1], &[IndexRange::new(8, 4)], 2);
        let b = GeometryKey::new(&[0.5], &[0.1], &[IndexRange::new(8, 4)], 2);
        let c = GeometryKey::new(&[0.5], &[0.1], &[IndexRange::new(9, 4)], 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.dims(), 1);
        assert_eq!(a.owned_extents().as_slice(), &[4]);
    }

    #[test]
    fn mask_1d_layout() {
        let mask = build_ghost_mask(&[3], 2).unwrap();
        assert_eq!(mask.as_slice::<u8>().unwrap(), &[1, 1, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn mask_2d_zero_halo_is_all_owned() {
        let mask = build_ghost_mask(&[2, 3], 0).unwrap();
        assert_eq!(mask.extents(), &[2, 3]);
        assert!(mask.as_slice::<u8>().unwrap().iter().all(|&v| v == 0));
    }

    #[test]
    fn four_axes_rejected() {
        let err = build_ghost_mask(&[2, 2, 2, 2], 1).unwrap_err();
        assert_eq!(
            err,
            MarshalError::Core(CoreError::UnsupportedDimensionality { dims: 4, max: 3 })
        );
    }

    proptest! {
        #[test]
        fn mask_marks_exactly_the_halo(
            nx in 1usize..5,
            ny in 1usize..5,
            nz in 1usize..5,
            h in 0usize..3,
        ) {
            let mask = build_ghost_mask(&[nx, ny, nz], h).unwrap();
            let full = [nx + 2 * h, ny + 2 * h, nz + 2 * h];
            prop_assert_eq!(mask.extents(), &full[..]);
            let mut zeros = 0;
            for i in 0..full[0] {
                for j in 0..full[1] {
                    for k in 0..full[2] {
                        let owned = (h..h + nx).contains(&i)
                            && (h..h + ny).contains(&j)
                            && (h..h + nz).contains(&k);
                        let v = mask.get::<u8>(&[i, j, k], 0).unwrap();
                        prop_assert_eq!(v, if owned { 0 } else { 1 });
                        if v == 0 {
                            zeros += 1;
                        }
                    }
                }
            }
            prop_assert_eq!(zeros, nx * ny * nz);
        }
    }
}
