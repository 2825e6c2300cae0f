//! The analysis backend boundary.
//!
//! A [`Backend`] is the opaque consumer of the exchange graph. Every
//! call reports a [`BackendStatus`]; a failing backend never panics
//! across this boundary.

use std::fmt;

use situ_graph::{GraphView, Node};

/// Outcome of a backend call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendStatus {
    /// The call succeeded.
    Ok,
    /// The call failed with a backend-specific code.
    Failed {
        /// Backend error code.
        code: i32,
    },
}

impl BackendStatus {
    /// Whether the call succeeded.
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Failed { code } => write!(f, "failed (code {code})"),
        }
    }
}

/// Which backend call produced a status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendCall {
    /// [`Backend::initialize`].
    Initialize,
    /// [`Backend::execute`].
    Execute,
    /// [`Backend::fetch_results`].
    FetchResults,
    /// [`Backend::finalize`].
    Finalize,
}

impl fmt::Display for BackendCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialize => "initialize",
            Self::Execute => "execute",
            Self::FetchResults => "fetch_results",
            Self::Finalize => "finalize",
        };
        f.write_str(s)
    }
}

/// An in-situ analysis backend.
pub trait Backend {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Receive the configuration graph once, before the first cycle.
    fn initialize(&mut self, config: &Node) -> BackendStatus;

    /// Consume one cycle's exchange graph.
    ///
    /// External arrays in `view` resolve until the call returns; the
    /// backend must not retain them.
    fn execute(&mut self, view: GraphView<'_>) -> BackendStatus;

    /// Write steering results into `results`.
    fn fetch_results(&mut self, results: &mut Node) -> BackendStatus;

    /// Release backend resources.
    fn finalize(&mut self) -> BackendStatus;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn initialize(&mut self, config: &Node) -> BackendStatus {
        (**self).initialize(config)
    }

    fn execute(&mut self, view: GraphView<'_>) -> BackendStatus {
        (**self).execute(view)
    }

    fn fetch_results(&mut self, results: &mut Node) -> BackendStatus {
        (**self).fetch_results(results)
    }

    fn finalize(&mut self) -> BackendStatus {
        (**self).finalize()
    }
}
