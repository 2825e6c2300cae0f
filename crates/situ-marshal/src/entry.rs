//! Registry entries.
//!
//! An [`Entry`] borrows one piece of simulation state for the duration
//! of a cycle. The category is fixed when the entry is created, so
//! dispatch is a `match` rather than a runtime type query.

use std::fmt;

use situ_core::DType;
use situ_graph::{Node, Value};

use crate::error::SteeringError;
use crate::field::FieldSource;
use crate::particle::ParticleSource;
use crate::steering::{self, SteerTarget};

/// A mutable borrow of a steerable scalar.
///
/// Steering writes the backend's value straight back through the borrow.
#[derive(Debug)]
pub enum ScalarSlot<'a> {
    /// A 64-bit float.
    F64(&'a mut f64),
    /// A 32-bit float.
    F32(&'a mut f32),
    /// A 32-bit signed integer.
    I32(&'a mut i32),
    /// A 32-bit unsigned integer.
    U32(&'a mut u32),
}

impl ScalarSlot<'_> {
    /// Element type of the borrowed scalar.
    pub fn dtype(&self) -> DType {
        match self {
            Self::F64(_) => <f64 as SteerTarget>::DTYPE,
            Self::F32(_) => <f32 as SteerTarget>::DTYPE,
            Self::I32(_) => <i32 as SteerTarget>::DTYPE,
            Self::U32(_) => <u32 as SteerTarget>::DTYPE,
        }
    }

    /// Current value as a graph value of its native type.
    pub fn value(&self) -> Value {
        match self {
            Self::F64(v) => (**v).into_value(),
            Self::F32(v) => (**v).into_value(),
            Self::I32(v) => (**v).into_value(),
            Self::U32(v) => (**v).into_value(),
        }
    }

    /// Overwrite the scalar with the steered value for `label` in `results`.
    pub fn pull_from(&mut self, results: &Node, label: &str) -> Result<(), SteeringError> {
        match self {
            Self::F64(v) => **v = steering::pull(results, label)?,
            Self::F32(v) => **v = steering::pull(results, label)?,
            Self::I32(v) => **v = steering::pull(results, label)?,
            Self::U32(v) => **v = steering::pull(results, label)?,
        }
        Ok(())
    }
}

macro_rules! impl_slot_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> From<&'a mut $ty> for ScalarSlot<'a> {
                fn from(v: &'a mut $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_slot_from!(f64 => F64, f32 => F32, i32 => I32, u32 => U32);

/// Category of a registered entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryCategory {
    /// A steerable scalar.
    Scalar,
    /// A particle collection.
    Particles,
    /// A field.
    Field,
}

impl fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scalar => "scalar",
            Self::Particles => "particles",
            Self::Field => "field",
        };
        f.write_str(s)
    }
}

/// One registered piece of simulation state.
pub enum Entry<'a> {
    /// A steerable scalar.
    Scalar(ScalarSlot<'a>),
    /// A particle collection.
    Particles(&'a dyn ParticleSource),
    /// A field.
    Field(&'a dyn FieldSource),
}

impl Entry<'_> {
    /// The entry's category.
    pub fn category(&self) -> EntryCategory {
        match self {
            Self::Scalar(_) => EntryCategory::Scalar,
            Self::Particles(_) => EntryCategory::Particles,
            Self::Field(_) => EntryCategory::Field,
        }
    }
}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => f.debug_tuple("Scalar").field(s).finish(),
            Self::Particles(p) => f
                .debug_struct("Particles")
                .field("count", &p.local_count())
                .finish(),
            Self::Field(fs) => f
                .debug_struct("Field")
                .field("kind", &fs.element_kind())
                .field("dims", &fs.dims())
                .finish(),
        }
    }
}
