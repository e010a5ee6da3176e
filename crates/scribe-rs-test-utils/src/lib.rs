//! Test helpers shared across Scribe crates.

pub mod collaborator;
pub mod context;
pub mod llm;
pub mod tools;

pub use collaborator::RecordingCollaborator;
pub use context::{base_tool_context, base_tool_services};
pub use llm::{
    AlwaysToolLLM, FailingLLM, FixedChatResponse, ScriptedLLM, ScriptedReply, tool_call,
};
pub use tools::{DummyTool, PanickingTool};
