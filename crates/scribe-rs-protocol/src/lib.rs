//! Wire protocol types for Scribe conversations, tool results, and run events.

mod message;
mod tool;

pub use message::{ContentBlock, Message, Role, ToolInvocation, ToolResult};
pub use tool::ToolError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for a conversation turn.
pub type TurnId = Uuid;

/// Wrapper for events emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMsg {
    /// Unique id for the event.
    pub id: Uuid,
    /// Turn that produced the event.
    pub turn_id: TurnId,
    /// Timestamp when the event was created.
    pub created_at: DateTime<Utc>,
    /// Event payload content.
    pub payload: EventPayload,
}

impl EventMsg {
    /// Stamp a payload with a fresh id and the current time.
    pub fn new(turn_id: TurnId, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            turn_id,
            created_at: Utc::now(),
            payload,
        }
    }
}

/// All events emitted by a streaming run, in strict temporal order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum EventPayload {
    /// Incremental assistant text.
    Token { text: String },
    /// A tool invocation is about to be dispatched.
    ToolStart { name: String, input: Value },
    /// A tool invocation finished.
    ToolDone {
        name: String,
        result: String,
        success: bool,
    },
    /// Terminal summary carrying the full tool audit list.
    Summary {
        text: String,
        tool_results: Vec<ToolResult>,
        rounds: usize,
        ceiling_hit: bool,
    },
    /// The language model could not be reached; the run is about to fail.
    Error { message: String },
}

impl EventPayload {
    /// Whether this payload ends the event stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Summary { .. } | Self::Error { .. })
    }
}

/// Sink interface for run events.
pub trait EventSink: Send + Sync {
    /// Emit an event to downstream listeners.
    fn emit(&self, event: EventMsg);
}
