//! Per-cycle host buffer arena for Situ.
//!
//! Every array the exchange graph refers to by reference lives in a
//! [`BufferRegistry`] until the cycle ends. The registry hands out
//! epoch-scoped [`BufferHandle`]s; clearing the registry releases every
//! buffer at once and bumps the epoch, so a handle that outlives its
//! cycle fails to resolve instead of reading freed data.
//!
//! ```text
//! BufferRegistry
//! ├── slots: Vec<Option<Arc<HostBuffer>>>   (released on replace/clear)
//! ├── labels: IndexMap<Label, [slot]>       (primary buffer first)
//! └── epoch + fence flag
//! ```
//!
//! [`transfer`] provides the element-wise copy that moves data out of a
//! row-major [`DeviceArray`](situ_core::DeviceArray) into a column-major
//! [`HostBuffer`], optionally restricted to a window (halo stripping).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod error;
pub mod handle;
pub mod registry;
pub mod transfer;

pub use buffer::{HostBuffer, HostData, HostScalar, Layout};
pub use error::ArenaError;
pub use handle::BufferHandle;
pub use registry::{BufferRegistry, BufferScope};
pub use transfer::{copy_window, mirror_to_host, CopyPolicy};
