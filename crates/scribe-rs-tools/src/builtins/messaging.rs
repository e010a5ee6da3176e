//! Built-in tools that hand payloads to external collaborators.

use crate::builtins::utils::{input_schema, parse_args, require_text};
use crate::collaborator::{CollaboratorResponse, WORKFLOW_COLLABORATOR};
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use autoagents_derive::ToolInput;
use log::info;
use scribe_rs_protocol::ToolError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

/// Tool sending a message through a named channel (messaging, email, ...).
#[derive(Debug, Default)]
pub struct SendMessageTool;

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send a message to someone through a configured channel such as messaging or email"
    }

    fn args_schema(&self) -> Value {
        input_schema::<SendMessageArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: SendMessageArgs = parse_args(args)?;
        let channel = require_text("channel", &input.channel)?;
        let to = require_text("to", &input.to)?;
        let body = require_text("body", &input.body)?;
        let response = deliver(ctx, channel, json!({ "to": to, "body": body })).await?;
        info!("sent message (channel={}, to={})", channel, to);
        Ok(describe_success(
            format!("Sent {channel} message to {to}"),
            &response,
        ))
    }
}

/// Tool starting an external workflow.
#[derive(Debug, Default)]
pub struct TriggerWorkflowTool;

#[async_trait]
impl Tool for TriggerWorkflowTool {
    fn name(&self) -> &str {
        "trigger_workflow"
    }

    fn description(&self) -> &str {
        "Trigger a named automation workflow, optionally with a JSON payload"
    }

    fn args_schema(&self) -> Value {
        input_schema::<TriggerWorkflowArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: TriggerWorkflowArgs = parse_args(args)?;
        let workflow = require_text("workflow", &input.workflow)?;
        let payload = match input.payload.as_deref().map(str::trim) {
            None | Some("") => Value::Null,
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
        };
        let response = deliver(
            ctx,
            WORKFLOW_COLLABORATOR,
            json!({ "workflow": workflow, "payload": payload }),
        )
        .await?;
        info!("triggered workflow (workflow={})", workflow);
        Ok(describe_success(
            format!("Triggered workflow {workflow}"),
            &response,
        ))
    }
}

/// Send to a collaborator, turning a failed envelope into a tool error.
async fn deliver(
    ctx: &ToolContext,
    name: &str,
    payload: Value,
) -> Result<CollaboratorResponse, ToolError> {
    let collaborator = ctx.services.collaborators.get(name).ok_or_else(|| {
        ToolError::ExecutionFailed(format!("no {name} integration is configured"))
    })?;
    let response = collaborator.send(payload).await;
    if !response.success {
        return Err(ToolError::ExecutionFailed(format!(
            "{name} integration reported an error: {}",
            response.error.as_deref().unwrap_or("unknown error")
        )));
    }
    Ok(response)
}

fn describe_success(summary: String, response: &CollaboratorResponse) -> String {
    match &response.data {
        None | Some(Value::Null) => summary,
        Some(Value::String(text)) => format!("{summary}: {text}"),
        Some(data) => format!("{summary}: {data}"),
    }
}

/// Arguments for SendMessageTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct SendMessageArgs {
    #[input(description = "Channel to use, e.g. messaging or email.")]
    channel: String,
    #[input(description = "Recipient name, handle, or address.")]
    to: String,
    #[input(description = "Message text.")]
    body: String,
}

/// Arguments for TriggerWorkflowTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct TriggerWorkflowArgs {
    #[input(description = "Workflow name.")]
    workflow: String,
    #[input(description = "Optional JSON payload passed to the workflow.")]
    #[serde(default, deserialize_with = "payload_text")]
    payload: Option<String>,
}

/// Models send the payload either as JSON text or as inline JSON.
fn payload_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}
