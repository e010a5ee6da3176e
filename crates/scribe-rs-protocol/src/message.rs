//! Conversation data model shared by the orchestrator and its callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Human input, and tool results echoed back to the model.
    User,
    /// Model output.
    Assistant,
}

/// One block of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },
    /// A tool invocation requested by the model.
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    /// The outcome of an earlier tool invocation.
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

/// A single conversation message. Blocks keep the order the model produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Message author.
    pub role: Role,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Build a plain-text user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Build a plain-text assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Concatenate every text block, ignoring tool blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool invocations carried by this message, in emission order.
    pub fn tool_invocations(&self) -> Vec<ToolInvocation> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolInvocation {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

/// A tool call emitted by the model inside an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    /// Provider-assigned call id used to pair the result.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Input mapping; anything but a JSON object is rejected at dispatch.
    pub input: Value,
}

impl ToolInvocation {
    /// Input fields as a map, if the input is an object.
    pub fn input_object(&self) -> Option<&Map<String, Value>> {
        self.input.as_object()
    }
}

/// Audit record of one dispatched tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool_name: String,
    pub tool_input: Value,
    pub result_text: String,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn assistant_blocks_keep_interleaved_order() {
        let message = Message {
            role: Role::Assistant,
            content: vec![
                ContentBlock::Text {
                    text: "Checking. ".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "task_list".to_string(),
                    input: json!({}),
                },
                ContentBlock::Text {
                    text: "Then toggling.".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "call_2".to_string(),
                    name: "task_toggle".to_string(),
                    input: json!({ "index": 1 }),
                },
            ],
        };

        assert_eq!(message.text(), "Checking. Then toggling.");
        let names = message
            .tool_invocations()
            .into_iter()
            .map(|call| call.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["task_list", "task_toggle"]);
    }

    #[test]
    fn content_block_uses_type_tag() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "call_1".to_string(),
            content: "ok".to_string(),
            is_error: false,
        };
        assert_eq!(
            serde_json::to_value(&block).expect("serialize"),
            json!({
                "type": "tool_result",
                "tool_use_id": "call_1",
                "content": "ok",
                "is_error": false
            })
        );
    }

    #[test]
    fn non_object_input_has_no_fields() {
        let call = ToolInvocation {
            id: "call_1".to_string(),
            name: "vault_read".to_string(),
            input: json!("notes/today.md"),
        };
        assert!(call.input_object().is_none());
    }
}
