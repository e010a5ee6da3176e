//! Conversions between the Scribe conversation model and the LLM chat types.

use autoagents_llm::chat::{ChatMessage, ChatRole, FunctionTool, MessageType, Tool};
use autoagents_llm::{FunctionCall, ToolCall};
use log::warn;
use scribe_rs_protocol::{ContentBlock, Message, Role, ToolInvocation};
use scribe_rs_tools::ToolSpec;
use serde_json::{Value, json};
use std::collections::HashMap;

const FUNCTION_CALL_TYPE: &str = "function";

/// Build the chat request: system prompt first, then the conversation.
///
/// Tool results travel as tool-role messages paired by call id, so the
/// originating tool name is looked up from the earlier tool-use block.
pub(crate) fn to_chat_messages(system_prompt: &str, conversation: &[Message]) -> Vec<ChatMessage> {
    let mut output = Vec::with_capacity(conversation.len() + 1);
    if !system_prompt.trim().is_empty() {
        output.push(ChatMessage {
            role: ChatRole::System,
            message_type: MessageType::Text,
            content: system_prompt.to_string(),
        });
    }

    let mut tool_names: HashMap<String, String> = HashMap::new();
    for message in conversation {
        let mut text = String::new();
        let mut calls = Vec::new();
        let mut results = Vec::new();
        for block in &message.content {
            match block {
                ContentBlock::Text { text: chunk } => text.push_str(chunk),
                ContentBlock::ToolUse { id, name, input } => {
                    tool_names.insert(id.clone(), name.clone());
                    calls.push(ToolCall {
                        id: id.clone(),
                        call_type: FUNCTION_CALL_TYPE.to_string(),
                        function: FunctionCall {
                            name: name.clone(),
                            arguments: input.to_string(),
                        },
                    });
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => results.push(ToolCall {
                    id: tool_use_id.clone(),
                    call_type: FUNCTION_CALL_TYPE.to_string(),
                    function: FunctionCall {
                        name: tool_names.get(tool_use_id).cloned().unwrap_or_default(),
                        arguments: content.clone(),
                    },
                }),
            }
        }

        if !results.is_empty() {
            output.push(ChatMessage {
                role: ChatRole::Tool,
                message_type: MessageType::ToolResult(results),
                content: String::new(),
            });
        }
        let role = match message.role {
            Role::User => ChatRole::User,
            Role::Assistant => ChatRole::Assistant,
        };
        if !calls.is_empty() {
            output.push(ChatMessage {
                role,
                message_type: MessageType::ToolUse(calls),
                content: text,
            });
        } else if !text.is_empty() {
            output.push(ChatMessage {
                role,
                message_type: MessageType::Text,
                content: text,
            });
        }
    }
    output
}

/// Catalog entries in the shape the model expects.
pub(crate) fn to_chat_tools(specs: &[ToolSpec]) -> Vec<Tool> {
    specs
        .iter()
        .map(|spec| Tool {
            tool_type: FUNCTION_CALL_TYPE.to_string(),
            function: FunctionTool {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.args_schema.clone(),
            },
        })
        .collect()
}

/// Turn a model tool call into an invocation.
///
/// Arguments that are not valid JSON are kept as a string so the dispatcher
/// rejects them with a readable message instead of the loop failing.
pub(crate) fn to_invocation(call: ToolCall) -> ToolInvocation {
    let raw = call.function.arguments.trim();
    let input = if raw.is_empty() {
        json!({})
    } else {
        serde_json::from_str::<Value>(raw).unwrap_or_else(|err| {
            warn!(
                "tool arguments are not valid JSON (name={}, id={}): {}",
                call.function.name, call.id, err
            );
            Value::String(raw.to_string())
        })
    };
    ToolInvocation {
        id: call.id,
        name: call.function.name,
        input,
    }
}

/// The assistant message recorded for one model reply.
pub(crate) fn assistant_message(text: &str, invocations: &[ToolInvocation]) -> Message {
    let mut content = Vec::with_capacity(invocations.len() + 1);
    if !text.is_empty() {
        content.push(ContentBlock::Text {
            text: text.to_string(),
        });
    }
    content.extend(invocations.iter().map(|call| ContentBlock::ToolUse {
        id: call.id.clone(),
        name: call.name.clone(),
        input: call.input.clone(),
    }));
    Message {
        role: Role::Assistant,
        content,
    }
}
