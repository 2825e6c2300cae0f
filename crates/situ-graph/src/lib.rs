//! Exchange graph for Situ.
//!
//! The exchange graph is the self-describing tree handed to the analysis
//! backend each cycle. Interior [`Node`]s are keyed by name and addressed
//! with `/`-separated paths (`channels/sfield_rho/data/fields/rho/values`);
//! leaves hold a [`Value`]. Bulk arrays are not copied into the graph:
//! they are recorded as [`ExternalArray`] references into a
//! [`BufferRegistry`](situ_arena::BufferRegistry) and only resolved when a
//! consumer reads them through a [`GraphView`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod json;
pub mod node;
pub mod value;
pub mod view;

pub use error::GraphError;
pub use node::Node;
pub use value::{ExternalArray, Value};
pub use view::GraphView;
