//! Compute-to-host transfers.
//!
//! [`copy_window`] is the element-wise transform copy: it reads a window
//! of a row-major [`DeviceArray`] and writes it into a fresh column-major
//! [`HostBuffer`], keeping each element's components contiguous. It
//! serves both halo stripping (window = owned interior) and full
//! allocation exports (window = everything).
//!
//! [`mirror_to_host`] is the single-axis variant used for particle
//! attributes, where row-major and column-major coincide and a
//! host-resident array can be shared instead of copied.

use std::ops::Range;
use std::sync::Arc;

use smallvec::SmallVec;

use situ_core::{DeviceArray, MemorySpace};

use crate::buffer::{HostBuffer, HostScalar, Layout};
use crate::error::ArenaError;

/// Whether a host export may share the source allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyPolicy {
    /// Always produce an independent copy.
    ForceCopy,
    /// Share the allocation when the source is already host-resident.
    ReuseHostResident,
}

/// Copy `window` of `src` into a new column-major host buffer.
///
/// `window` must have one range per axis; `None` copies the whole array.
/// The result has extents equal to the window lengths.
pub fn copy_window<S: HostScalar>(
    src: &DeviceArray<S>,
    window: Option<&[Range<usize>]>,
) -> Result<HostBuffer, ArenaError> {
    let extents = src.extents();
    let rank = extents.len();
    let window: SmallVec<[Range<usize>; 4]> = match window {
        Some(w) => w.iter().cloned().collect(),
        None => extents.iter().map(|&e| 0..e).collect(),
    };
    if window.len() != rank {
        return Err(situ_core::CoreError::ShapeMismatch {
            expected: rank,
            actual: window.len(),
        }
        .into());
    }
    for (axis, (r, &extent)) in window.iter().zip(extents.iter()).enumerate() {
        if r.end > extent || r.start > r.end {
            return Err(ArenaError::WindowOutOfBounds {
                axis,
                end: r.end,
                extent,
            });
        }
    }

    let out_extents: SmallVec<[usize; 4]> = window.iter().map(|r| r.len()).collect();
    let total: usize = out_extents.iter().product();
    let comps = src.components();
    let mut out = vec![S::default(); total * comps];

    if total > 0 {
        let mut src_stride: SmallVec<[usize; 4]> = SmallVec::from_elem(0, rank);
        let mut acc = 1;
        for a in (0..rank).rev() {
            src_stride[a] = acc;
            acc *= extents[a];
        }
        let mut dst_stride: SmallVec<[usize; 4]> = SmallVec::from_elem(0, rank);
        let mut acc = 1;
        for a in 0..rank {
            dst_stride[a] = acc;
            acc *= out_extents[a];
        }

        let data = src.as_slice();
        let mut idx: SmallVec<[usize; 4]> = SmallVec::from_elem(0, rank);
        for _ in 0..total {
            let mut s = 0;
            let mut d = 0;
            for a in 0..rank {
                s += (window[a].start + idx[a]) * src_stride[a];
                d += idx[a] * dst_stride[a];
            }
            out[d * comps..(d + 1) * comps].copy_from_slice(&data[s * comps..(s + 1) * comps]);

            // Advance in source order, last axis fastest.
            for a in (0..rank).rev() {
                idx[a] += 1;
                if idx[a] < out_extents[a] {
                    break;
                }
                idx[a] = 0;
            }
        }
    }

    HostBuffer::from_vec(out, &out_extents, comps, Layout::ColumnMajor)
}

/// Export a single-axis array to the host.
///
/// With [`CopyPolicy::ReuseHostResident`] and a host-resident source,
/// the returned buffer shares the source allocation. Otherwise the data
/// is deep-copied.
pub fn mirror_to_host<S: HostScalar>(
    src: &DeviceArray<S>,
    policy: CopyPolicy,
) -> Result<HostBuffer, ArenaError> {
    let reusable = src.rank() <= 1
        && src.space() == MemorySpace::Host
        && policy == CopyPolicy::ReuseHostResident;
    if reusable {
        HostBuffer::new(
            S::wrap(Arc::clone(src.shared())),
            src.extents(),
            src.components(),
            Layout::ColumnMajor,
        )
    } else {
        copy_window(src, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn iota(extents: &[usize], comps: usize) -> DeviceArray<f64> {
        let n = extents.iter().product::<usize>() * comps;
        DeviceArray::from_vec((0..n).map(|v| v as f64).collect(), extents, comps, MemorySpace::Device)
            .unwrap()
    }

    #[test]
    fn full_copy_transposes_2d() {
        // row-major [[0,1,2],[3,4,5]]
        let src = iota(&[2, 3], 1);
        let host = copy_window(&src, None).unwrap();
        assert_eq!(host.extents(), &[2, 3]);
        assert_eq!(host.layout(), Layout::ColumnMajor);
        assert_eq!(
            host.as_slice::<f64>().unwrap(),
            &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]
        );
    }

    #[test]
    fn window_strips_halo() {
        // 4x4 with a one-cell halo: interior is rows 1..3, cols 1..3
        let src = iota(&[4, 4], 1);
        let host = copy_window(&src, Some(&[1..3, 1..3][..])).unwrap();
        assert_eq!(host.extents(), &[2, 2]);
        assert_eq!(host.get::<f64>(&[0, 0], 0), Some(5.0));
        assert_eq!(host.get::<f64>(&[1, 0], 0), Some(9.0));
        assert_eq!(host.get::<f64>(&[0, 1], 0), Some(6.0));
        assert_eq!(host.get::<f64>(&[1, 1], 0), Some(10.0));
    }

    #[test]
    fn components_stay_interleaved() {
        let src = iota(&[2, 2], 3);
        let host = copy_window(&src, None).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                for c in 0..3 {
                    assert_eq!(host.get::<f64>(&[i, j], c), src.get(&[i, j], c));
                }
            }
        }
        // (1, 0) is the second element in column-major order.
        assert_eq!(&host.as_slice::<f64>().unwrap()[3..6], &[6.0, 7.0, 8.0]);
    }

    #[test]
    fn window_out_of_bounds_rejected() {
        let src = iota(&[3], 1);
        let err = copy_window(&src, Some(&[1..4][..])).unwrap_err();
        assert_eq!(
            err,
            ArenaError::WindowOutOfBounds {
                axis: 0,
                end: 4,
                extent: 3
            }
        );
        assert!(copy_window(&src, Some(&[0..1, 0..1][..])).is_err());
    }

    #[test]
    fn mirror_reuses_host_resident_storage() {
        let src = DeviceArray::from_vec(vec![1i64, 2, 3], &[3], 1, MemorySpace::Host).unwrap();
        let shared = mirror_to_host(&src, CopyPolicy::ReuseHostResident).unwrap();
        assert!(shared.shares_storage(src.shared()));
        let copied = mirror_to_host(&src, CopyPolicy::ForceCopy).unwrap();
        assert!(!copied.shares_storage(src.shared()));
        assert_eq!(copied.as_slice::<i64>().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn mirror_copies_device_resident_storage() {
        let src = DeviceArray::from_vec(vec![1.0f32, 2.0], &[2], 1, MemorySpace::Device).unwrap();
        let host = mirror_to_host(&src, CopyPolicy::ReuseHostResident).unwrap();
        assert!(!host.shares_storage(src.shared()));
        assert_eq!(host.as_slice::<f32>().unwrap(), &[1.0, 2.0]);
    }

    proptest! {
        #[test]
        fn copy_preserves_every_element(
            e0 in 1usize..5,
            e1 in 1usize..5,
            e2 in 1usize..5,
            comps in 1usize..4,
        ) {
            let src = iota(&[e0, e1, e2], comps);
            let host = copy_window(&src, None).unwrap();
            for i in 0..e0 {
                for j in 0..e1 {
                    for k in 0..e2 {
                        for c in 0..comps {
                            prop_assert_eq!(host.get::<f64>(&[i, j, k], c), src.get(&[i, j, k], c));
                        }
                    }
                }
            }
        }

        #[test]
        fn window_copy_matches_offset_reads(
            e0 in 2usize..6,
            e1 in 2usize..6,
            h in 0usize..2,
        ) {
            let full0 = e0 + 2 * h;
            let full1 = e1 + 2 * h;
            let src = iota(&[full0, full1], 1);
            let host = copy_window(&src, Some(&[h..h + e0, h..h + e1][..])).unwrap();
            prop_assert_eq!(host.extents(), &[e0, e1][..]);
            for i in 0..e0 {
                for j in 0..e1 {
                    prop_assert_eq!(host.get::<f64>(&[i, j], 0), src.get(&[i + h, j + h], 0));
                }
            }
        }
    }
}
