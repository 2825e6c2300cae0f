//! Core types for the Situ in-situ marshaling bridge.
//!
//! This crate defines the vocabulary shared by every other Situ crate:
//! labels that key every registry, element and scalar traits that carry
//! the static type information needed for dispatch, uniform mesh
//! geometry, and the row-major [`DeviceArray`] that stands in for
//! compute-memory storage.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
pub mod element;
pub mod error;
pub mod geometry;
pub mod id;

pub use array::{DeviceArray, MemorySpace};
pub use element::{DType, ElementKind, FieldElement, Scalar, Vector};
pub use error::CoreError;
pub use geometry::{for_each_index, FieldLayout, IndexRange, SpatialRegion, UniformMesh, MAX_AXES};
pub use id::{CycleId, Label, RankId};
