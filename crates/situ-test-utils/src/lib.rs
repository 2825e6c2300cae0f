//! Test utilities and mock backends for Situ development.
//!
//! Provides mock [`Backend`](situ_engine::Backend) implementations
//! ([`NullBackend`], [`EchoBackend`], [`RecordingBackend`],
//! [`FailingBackend`]), field and particle fixtures, and a tracing
//! initializer for tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod backends;
pub mod fixtures;

pub use backends::{EchoBackend, FailingBackend, NullBackend, RecordingBackend};
pub use fixtures::{
    particle_cloud, proxy_script_dir, scalar_cube, vector_plane, PROXY_TEMPLATE_TEXT,
};

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test-writer fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
