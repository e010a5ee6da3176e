//! Core orchestration for Scribe.
//!
//! This crate owns the turn state machine and the driver that alternates
//! between the language model and the tool dispatcher.

pub mod error;
pub mod orchestrator;

pub use error::OrchestratorError;
/// Orchestrator facade and run handles.
pub use orchestrator::{
    Orchestrator, RunResult, RunStream,
    machine::{TurnEvent, TurnInput, TurnMachine, TurnState},
    prompt::PromptBuilder,
};
pub use scribe_rs_protocol::EventSink;
