//! Element and scalar type descriptions.
//!
//! Every value that crosses into the exchange graph is built from a
//! [`Scalar`] primitive. Field cells hold a [`FieldElement`], which is
//! either a scalar or a fixed-size [`Vector`] of scalars; the element's
//! [`ElementKind`] is a compile-time constant so marshalers can pick
//! the right graph layout without inspecting data.

use std::fmt;
use std::ops::{Index, IndexMut};

/// Primitive element type of a host buffer or graph array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    /// 64-bit float.
    F64,
    /// 32-bit float.
    F32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit signed integer.
    I32,
    /// 64-bit unsigned integer.
    U64,
    /// 32-bit unsigned integer.
    U32,
    /// 8-bit unsigned integer (ghost masks).
    U8,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::F64 | Self::I64 | Self::U64 => 8,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::U8 => 1,
        }
    }

    /// Short lowercase name (`"f64"`, `"u8"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::I64 => "i64",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::U32 => "u32",
            Self::U8 => "u8",
        }
    }

    /// Whether this is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(self, Self::F64 | Self::F32)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A primitive numeric type that can be stored in a host buffer.
pub trait Scalar: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Runtime tag for this type.
    const DTYPE: DType;

    /// Lossy widening to `f64`, used for diagnostics and JSON dumps.
    fn to_f64(self) -> f64;
}

macro_rules! impl_scalar {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const DTYPE: DType = DType::$tag;

                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_scalar!(
    f64 => F64,
    f32 => F32,
    i64 => I64,
    i32 => I32,
    u64 => U64,
    u32 => U32,
    u8 => U8,
);

/// Structural category of a field element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// One scalar per cell.
    Scalar,
    /// A fixed-size vector per cell.
    Vector {
        /// Number of components.
        components: usize,
    },
    /// Anything else. Marshalers skip fields of this kind.
    Opaque,
}

impl ElementKind {
    /// Number of scalar components per element.
    pub fn components(self) -> usize {
        match self {
            Self::Scalar | Self::Opaque => 1,
            Self::Vector { components } => components,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Vector { components } => write!(f, "vector<{components}>"),
            Self::Opaque => f.write_str("opaque"),
        }
    }
}

/// The per-cell element type of a field or particle attribute.
///
/// An element is stored as `COMPONENTS` consecutive values of
/// [`Self::Scalar`].
pub trait FieldElement: Copy + Default + Send + Sync + 'static {
    /// Underlying scalar type of each component.
    type Scalar: Scalar;

    /// Number of scalar components.
    const COMPONENTS: usize;

    /// Structural kind used for marshaling dispatch.
    const KIND: ElementKind;

    /// Component `c` of this element.
    ///
    /// # Panics
    ///
    /// Panics if `c >= COMPONENTS`.
    fn component(&self, c: usize) -> Self::Scalar;

    /// Rebuild an element from `COMPONENTS` scalars.
    fn from_components(components: &[Self::Scalar]) -> Self;
}

macro_rules! impl_scalar_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldElement for $ty {
                type Scalar = $ty;
                const COMPONENTS: usize = 1;
                const KIND: ElementKind = ElementKind::Scalar;

                fn component(&self, c: usize) -> $ty {
                    assert_eq!(c, 0, "scalar element has a single component");
                    *self
                }

                fn from_components(components: &[$ty]) -> Self {
                    components[0]
                }
            }
        )*
    };
}

impl_scalar_element!(f64, f32, i64, i32, u64, u32, u8);

/// Fixed-size vector element with `N` components of scalar type `S`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector<S, const N: usize>(pub [S; N]);

impl<S: Scalar, const N: usize> Vector<S, N> {
    /// Create a vector from its components.
    pub fn new(components: [S; N]) -> Self {
        Self(components)
    }

    /// Borrow the components.
    pub fn as_array(&self) -> &[S; N] {
        &self.0
    }
}

impl<S: Scalar, const N: usize> Default for Vector<S, N> {
    fn default() -> Self {
        Self([S::default(); N])
    }
}

impl<S, const N: usize> Index<usize> for Vector<S, N> {
    type Output = S;

    fn index(&self, i: usize) -> &S {
        &self.0[i]
    }
}

impl<S, const N: usize> IndexMut<usize> for Vector<S, N> {
    fn index_mut(&mut self, i: usize) -> &mut S {
        &mut self.0[i]
    }
}

impl<S: Scalar, const N: usize> From<[S; N]> for Vector<S, N> {
    fn from(v: [S; N]) -> Self {
        Self(v)
    }
}

impl<S: Scalar, const N: usize> FieldElement for Vector<S, N> {
    type Scalar = S;
    const COMPONENTS: usize = N;
    const KIND: ElementKind = ElementKind::Vector { components: N };

    fn component(&self, c: usize) -> S {
        self.0[c]
    }

    fn from_components(components: &[S]) -> Self {
        let mut out = [S::default(); N];
        out.copy_from_slice(&components[..N]);
        Self(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_sizes() {
        assert_eq!(DType::F64.size(), 8);
        assert_eq!(DType::F32.size(), 4);
        assert_eq!(DType::U8.size(), 1);
        assert!(DType::F32.is_float());
        assert!(!DType::I32.is_float());
        assert_eq!(DType::U32.to_string(), "u32");
    }

    #[test]
    fn scalar_elements_are_scalar_kind() {
        assert_eq!(<f64 as FieldElement>::KIND, ElementKind::Scalar);
        assert_eq!(<u8 as FieldElement>::COMPONENTS, 1);
        assert_eq!(<i32 as Scalar>::DTYPE, DType::I32);
    }

    #[test]
    fn vector_kind_carries_components() {
        type V3 = Vector<f32, 3>;
        assert_eq!(V3::KIND, ElementKind::Vector { components: 3 });
        assert_eq!(V3::KIND.components(), 3);
        let v = V3::new([1.0, 2.0, 3.0]);
        assert_eq!(v.component(2), 3.0);
        assert_eq!(V3::from_components(&[1.0, 2.0, 3.0]), v);
        assert_eq!(v[1], 2.0);
    }

    #[test]
    fn vector_default_is_zero() {
        let v: Vector<i64, 2> = Vector::default();
        assert_eq!(v.0, [0, 0]);
    }
}
