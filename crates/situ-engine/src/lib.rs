//! Cycle orchestration for the Situ in-situ bridge.
//!
//! [`CycleOrchestrator`] ties the marshalers, buffer registry and ghost
//! mask cache to an analysis [`Backend`]. Configuration is captured once
//! in an [`AdaptorConfig`] and turned into the backend's configuration
//! graph (pipeline script, per-entry extractor scripts, steering
//! proxies) at [`initialize`](CycleOrchestrator::initialize).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod proxy;
pub mod scripts;

pub use backend::{Backend, BackendCall, BackendStatus};
pub use config::{AdaptorConfig, ConfigError, MaskCachePolicy};
pub use error::AdaptorError;
pub use metrics::CycleMetrics;
pub use orchestrator::CycleOrchestrator;
