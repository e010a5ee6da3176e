//! Utility helpers shared by built-in tools.

use autoagents_core::tool::ToolInputT;
use log::warn;
use scribe_rs_protocol::ToolError;
use scribe_rs_vault::VaultError;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Parse JSON args into a typed struct for tool calls.
pub(super) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|err| ToolError::InvalidArguments(err.to_string()))
}

/// JSON schema derived from a `ToolInput` struct.
pub(super) fn input_schema<T: ToolInputT>() -> Value {
    serde_json::from_str(T::io_schema()).unwrap_or_else(|err| {
        warn!("failed to parse tool input schema: {err}");
        empty_schema()
    })
}

/// Schema for tools that take no arguments.
pub(super) fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Reject blank required string fields.
pub(super) fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidArguments(format!(
            "{field} cannot be empty"
        )));
    }
    Ok(trimmed)
}

/// Map a vault failure onto the tool error taxonomy.
pub(super) fn vault_error(err: VaultError) -> ToolError {
    match err {
        VaultError::PathEscape(_) | VaultError::ProtectedPath(_) => {
            ToolError::PermissionDenied(err.to_string())
        }
        VaultError::InvalidPath(_) => ToolError::InvalidArguments(err.to_string()),
        other => ToolError::ExecutionFailed(other.to_string()),
    }
}
