//! Error types for the core orchestrator crate.

use thiserror::Error;

/// Errors returned by orchestrator operations.
///
/// Tool failures never show up here; the dispatcher turns them into data.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The language model could not be reached or rejected the request.
    #[error("model error: {0}")]
    Model(String),
    /// The turn machine was driven with an input its state does not accept.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    /// Background run task failed.
    #[error("executor error: {0}")]
    Executor(String),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
