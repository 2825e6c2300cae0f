//! Orchestrator error types.

use std::error::Error;
use std::fmt;

use situ_core::Label;
use situ_graph::GraphError;
use situ_marshal::{MarshalError, SteeringError};

use crate::backend::{BackendCall, BackendStatus};
use crate::config::ConfigError;

/// Errors surfaced by [`CycleOrchestrator`](crate::CycleOrchestrator).
#[derive(Debug)]
pub enum AdaptorError {
    /// A backend call whose failure is fatal did not succeed.
    BackendCallFailure {
        /// The failing call.
        call: BackendCall,
        /// Status it returned.
        status: BackendStatus,
    },
    /// `remember_now` named a label that is not registered.
    MissingLabel {
        /// The requested label.
        label: Label,
    },
    /// A visualization entry could not be marshaled.
    Marshal(MarshalError),
    /// A steered value could not be written back.
    Steering(SteeringError),
    /// Configuration is invalid.
    Config(ConfigError),
    /// The exchange graph could not be handed to the backend.
    Graph(GraphError),
    /// `execute` or `remember_now` was called before `initialize`.
    NotInitialized,
}

impl fmt::Display for AdaptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackendCallFailure { call, status } => {
                write!(f, "backend {call} {status}")
            }
            Self::MissingLabel { label } => write!(f, "no entry registered as '{label}'"),
            Self::Marshal(e) => write!(f, "marshal: {e}"),
            Self::Steering(e) => write!(f, "steering: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Graph(e) => write!(f, "graph: {e}"),
            Self::NotInitialized => f.write_str("orchestrator used before initialize"),
        }
    }
}

impl Error for AdaptorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Marshal(e) => Some(e),
            Self::Steering(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MarshalError> for AdaptorError {
    fn from(e: MarshalError) -> Self {
        Self::Marshal(e)
    }
}

impl From<SteeringError> for AdaptorError {
    fn from(e: SteeringError) -> Self {
        Self::Steering(e)
    }
}

impl From<ConfigError> for AdaptorError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<GraphError> for AdaptorError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}
