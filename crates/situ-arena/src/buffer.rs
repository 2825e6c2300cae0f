//! Host-resident buffers.
//!
//! A [`HostBuffer`] is the unit the registry keeps alive for the
//! duration of a cycle. Its storage is a dtype-tagged [`HostData`]
//! holding an `Arc<Vec<S>>`, so a host-resident simulation array can be
//! exported by sharing its allocation rather than copying it.

use std::sync::Arc;

use smallvec::SmallVec;

use situ_core::{CoreError, DType, Scalar};

use crate::error::ArenaError;

/// Memory order of a multi-axis buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Last axis fastest (compute order).
    RowMajor,
    /// First axis fastest (analysis backend order).
    ColumnMajor,
}

/// Dtype-tagged shared storage.
#[derive(Clone, Debug, PartialEq)]
pub enum HostData {
    /// 64-bit floats.
    F64(Arc<Vec<f64>>),
    /// 32-bit floats.
    F32(Arc<Vec<f32>>),
    /// 64-bit signed integers.
    I64(Arc<Vec<i64>>),
    /// 32-bit signed integers.
    I32(Arc<Vec<i32>>),
    /// 64-bit unsigned integers.
    U64(Arc<Vec<u64>>),
    /// 32-bit unsigned integers.
    U32(Arc<Vec<u32>>),
    /// Bytes.
    U8(Arc<Vec<u8>>),
}

macro_rules! with_data {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            HostData::F64($v) => $body,
            HostData::F32($v) => $body,
            HostData::I64($v) => $body,
            HostData::I32($v) => $body,
            HostData::U64($v) => $body,
            HostData::U32($v) => $body,
            HostData::U8($v) => $body,
        }
    };
}

macro_rules! map_data {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            HostData::F64($v) => HostData::F64($body),
            HostData::F32($v) => HostData::F32($body),
            HostData::I64($v) => HostData::I64($body),
            HostData::I32($v) => HostData::I32($body),
            HostData::U64($v) => HostData::U64($body),
            HostData::U32($v) => HostData::U32($body),
            HostData::U8($v) => HostData::U8($body),
        }
    };
}

impl HostData {
    /// Element type.
    pub fn dtype(&self) -> DType {
        match self {
            Self::F64(_) => DType::F64,
            Self::F32(_) => DType::F32,
            Self::I64(_) => DType::I64,
            Self::I32(_) => DType::I32,
            Self::U64(_) => DType::U64,
            Self::U32(_) => DType::U32,
            Self::U8(_) => DType::U8,
        }
    }

    /// Number of scalars.
    pub fn len(&self) -> usize {
        with_data!(self, v => v.len())
    }

    /// Whether the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.dtype().size()
    }

    /// Scalar `i` widened to `f64`.
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        with_data!(self, v => v.get(i).map(|x| x.to_f64()))
    }

    /// Every scalar widened to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_data!(self, v => v.iter().map(|x| x.to_f64()).collect())
    }

    /// Gather `count` scalars starting at `base`, `step` scalars apart,
    /// into fresh storage of the same dtype.
    ///
    /// Returns `None` if any index falls outside the storage.
    pub fn gather(&self, base: usize, step: usize, count: usize) -> Option<HostData> {
        if count > 0 && base + (count - 1) * step >= self.len() {
            return None;
        }
        Some(map_data!(self, v => Arc::new(
            (0..count).map(|i| v[base + i * step]).collect()
        )))
    }

    /// Whether both values share one allocation.
    pub fn ptr_eq(&self, other: &HostData) -> bool {
        match (self, other) {
            (Self::F64(a), Self::F64(b)) => Arc::ptr_eq(a, b),
            (Self::F32(a), Self::F32(b)) => Arc::ptr_eq(a, b),
            (Self::I64(a), Self::I64(b)) => Arc::ptr_eq(a, b),
            (Self::I32(a), Self::I32(b)) => Arc::ptr_eq(a, b),
            (Self::U64(a), Self::U64(b)) => Arc::ptr_eq(a, b),
            (Self::U32(a), Self::U32(b)) => Arc::ptr_eq(a, b),
            (Self::U8(a), Self::U8(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A [`Scalar`] that can be stored in [`HostData`].
pub trait HostScalar: Scalar {
    /// Wrap shared storage in the matching [`HostData`] variant.
    fn wrap(data: Arc<Vec<Self>>) -> HostData;

    /// Borrow the storage if `data` has this type.
    fn peek(data: &HostData) -> Option<&Arc<Vec<Self>>>;
}

macro_rules! impl_host_scalar {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl HostScalar for $ty {
                fn wrap(data: Arc<Vec<Self>>) -> HostData {
                    HostData::$tag(data)
                }

                fn peek(data: &HostData) -> Option<&Arc<Vec<Self>>> {
                    match data {
                        HostData::$tag(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_host_scalar!(
    f64 => F64,
    f32 => F32,
    i64 => I64,
    i32 => I32,
    u64 => U64,
    u32 => U32,
    u8 => U8,
);

/// A host-resident multi-axis buffer with interleaved components.
#[derive(Clone, Debug, PartialEq)]
pub struct HostBuffer {
    data: HostData,
    extents: SmallVec<[usize; 4]>,
    components: usize,
    layout: Layout,
}

impl HostBuffer {
    /// Wrap storage with its shape.
    ///
    /// Fails with [`ArenaError::Shape`] if the storage length is not
    /// `product(extents) * components`.
    pub fn new(
        data: HostData,
        extents: &[usize],
        components: usize,
        layout: Layout,
    ) -> Result<Self, ArenaError> {
        let expected = extents.iter().product::<usize>() * components;
        if data.len() != expected {
            return Err(CoreError::ShapeMismatch {
                expected,
                actual: data.len(),
            }
            .into());
        }
        Ok(Self {
            data,
            extents: extents.iter().copied().collect(),
            components,
            layout,
        })
    }

    /// Build a buffer from an owned vector.
    pub fn from_vec<S: HostScalar>(
        data: Vec<S>,
        extents: &[usize],
        components: usize,
        layout: Layout,
    ) -> Result<Self, ArenaError> {
        Self::new(S::wrap(Arc::new(data)), extents, components, layout)
    }

    /// The underlying storage.
    pub fn data(&self) -> &HostData {
        &self.data
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Extent of each axis.
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Scalars per element.
    pub fn components(&self) -> usize {
        self.components
    }

    /// Memory order.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Number of elements.
    pub fn element_count(&self) -> usize {
        self.extents.iter().product()
    }

    /// Number of scalars.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no scalars.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.byte_len()
    }

    /// Typed view of the scalars, if `S` matches the dtype.
    pub fn as_slice<S: HostScalar>(&self) -> Option<&[S]> {
        S::peek(&self.data).map(|v| v.as_slice())
    }

    /// Whether this buffer shares `storage` rather than holding a copy.
    pub fn shares_storage<S: HostScalar>(&self, storage: &Arc<Vec<S>>) -> bool {
        S::peek(&self.data).is_some_and(|v| Arc::ptr_eq(v, storage))
    }

    /// Component `c` of the element at `index`, honouring the layout.
    pub fn get<S: HostScalar>(&self, index: &[usize], c: usize) -> Option<S> {
        if index.len() != self.extents.len() || c >= self.components {
            return None;
        }
        if index.iter().zip(self.extents.iter()).any(|(i, e)| i >= e) {
            return None;
        }
        let offset = match self.layout {
            Layout::RowMajor => index
                .iter()
                .zip(self.extents.iter())
                .fold(0, |acc, (&i, &e)| acc * e + i),
            Layout::ColumnMajor => index
                .iter()
                .zip(self.extents.iter())
                .rev()
                .fold(0, |acc, (&i, &e)| acc * e + i),
        };
        self.as_slice::<S>()
            .and_then(|s| s.get(offset * self.components + c).copied())
    }
}
