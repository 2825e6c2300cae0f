//! Leaf values of the exchange graph.

use situ_arena::{BufferHandle, HostData};
use situ_core::DType;

/// A strided reference to data held in a buffer registry.
///
/// Element `i` lives at scalar index
/// `base + (offset_bytes + i * stride_bytes) / dtype.size()`
/// of the referenced buffer. Interleaved vector components are exported
/// as one reference per component sharing a buffer, each with `base`
/// set to the component index and `stride_bytes` set to the size of a
/// whole element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExternalArray {
    handle: BufferHandle,
    dtype: DType,
    count: usize,
    base: usize,
    offset_bytes: usize,
    stride_bytes: usize,
}

impl ExternalArray {
    /// A dense run of `count` scalars starting at the buffer's beginning.
    pub fn contiguous(handle: BufferHandle, dtype: DType, count: usize) -> Self {
        Self {
            handle,
            dtype,
            count,
            base: 0,
            offset_bytes: 0,
            stride_bytes: dtype.size(),
        }
    }

    /// Component `component` of `count` interleaved elements of
    /// `components` scalars each.
    pub fn component(
        handle: BufferHandle,
        dtype: DType,
        count: usize,
        component: usize,
        components: usize,
    ) -> Self {
        Self {
            handle,
            dtype,
            count,
            base: component,
            offset_bytes: 0,
            stride_bytes: components * dtype.size(),
        }
    }

    /// Referenced buffer.
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Scalar index of the first element.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Extra byte offset applied after `base`.
    pub fn offset_bytes(&self) -> usize {
        self.offset_bytes
    }

    /// Distance between consecutive elements in bytes.
    pub fn stride_bytes(&self) -> usize {
        self.stride_bytes
    }
}

/// A leaf value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Text.
    Str(String),
    /// Ordered list of strings (script arguments).
    StrList(Vec<String>),
    /// 64-bit float.
    F64(f64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit signed integer.
    I64(i64),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 32-bit unsigned integer.
    U32(u32),
    /// Owned numeric array.
    Array(HostData),
    /// Reference into a buffer registry.
    External(ExternalArray),
}

impl Value {
    /// Element type of a numeric value.
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Self::F64(_) => Some(DType::F64),
            Self::F32(_) => Some(DType::F32),
            Self::I64(_) => Some(DType::I64),
            Self::I32(_) => Some(DType::I32),
            Self::U64(_) => Some(DType::U64),
            Self::U32(_) => Some(DType::U32),
            Self::Array(a) => Some(a.dtype()),
            Self::External(e) => Some(e.dtype()),
            Self::Str(_) | Self::StrList(_) => None,
        }
    }

    /// Whether the value can be read as a number without resolution.
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::F64(_) | Self::F32(_) | Self::I64(_) | Self::I32(_) | Self::U64(_) | Self::U32(_) => {
                true
            }
            Self::Array(a) => !a.is_empty(),
            Self::Str(_) | Self::StrList(_) | Self::External(_) => false,
        }
    }

    /// The text of a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The list of a [`Value::StrList`].
    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            Self::StrList(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric value as `f64`. Arrays yield their first element.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::F64(v) => Some(*v),
            Self::F32(v) => Some(f64::from(*v)),
            Self::I64(v) => Some(*v as f64),
            Self::I32(v) => Some(f64::from(*v)),
            Self::U64(v) => Some(*v as f64),
            Self::U32(v) => Some(f64::from(*v)),
            Self::Array(a) => a.get_f64(0),
            Self::Str(_) | Self::StrList(_) | Self::External(_) => None,
        }
    }

    /// Numeric value as `f32`.
    pub fn to_f32(&self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(*v),
            other => other.to_f64().map(|v| v as f32),
        }
    }

    /// Numeric value as `i64`, truncating floats.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            Self::I32(v) => Some(i64::from(*v)),
            Self::U32(v) => Some(i64::from(*v)),
            Self::U64(v) => Some(*v as i64),
            other => other.to_f64().map(|v| v as i64),
        }
    }

    /// Numeric value as `i32`, truncating.
    pub fn to_i32(&self) -> Option<i32> {
        self.to_i64().map(|v| v as i32)
    }

    /// Numeric value as `u32`, truncating.
    pub fn to_u32(&self) -> Option<u32> {
        self.to_i64().map(|v| v as u32)
    }

    /// Short description of the variant for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::StrList(_) => "string list",
            Self::F64(_) => "f64",
            Self::F32(_) => "f32",
            Self::I64(_) => "i64",
            Self::I32(_) => "i32",
            Self::U64(_) => "u64",
            Self::U32(_) => "u32",
            Self::Array(_) => "array",
            Self::External(_) => "external array",
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from_value!(
    f64 => F64,
    f32 => F32,
    i64 => I64,
    i32 => I32,
    u64 => U64,
    u32 => U32,
    String => Str,
    Vec<String> => StrList,
    HostData => Array,
    ExternalArray => External,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn numeric_conversions() {
        let v = Value::from(3.5f64);
        assert_eq!(v.to_f64(), Some(3.5));
        assert_eq!(v.to_f32(), Some(3.5));
        assert_eq!(v.to_i32(), Some(3));
        assert_eq!(v.to_u32(), Some(3));
        assert_eq!(Value::from(7u32).to_f64(), Some(7.0));
        assert_eq!(Value::from(-2i32).to_i64(), Some(-2));
    }

    #[test]
    fn arrays_read_first_element() {
        let v = Value::from(HostData::F32(Arc::new(vec![1.25, 9.0])));
        assert!(v.is_numeric());
        assert_eq!(v.to_f64(), Some(1.25));
        let empty = Value::from(HostData::F64(Arc::new(Vec::new())));
        assert!(!empty.is_numeric());
        assert_eq!(empty.to_f64(), None);
    }

    #[test]
    fn strings_are_not_numeric() {
        let v = Value::from("hello");
        assert!(!v.is_numeric());
        assert_eq!(v.to_f64(), None);
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(v.dtype(), None);
        assert_eq!(v.kind_name(), "string");
    }
}
