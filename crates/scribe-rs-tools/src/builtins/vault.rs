//! Built-in document tools (read/write/list/move/delete).

use crate::builtins::utils::{input_schema, parse_args, require_text, vault_error};
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use autoagents_derive::ToolInput;
use log::info;
use scribe_rs_protocol::ToolError;
use scribe_rs_vault::WriteMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of documents listed in one reply.
const MAX_LISTED: usize = 200;

/// Tool for reading a vault document.
#[derive(Debug, Default)]
pub struct VaultReadTool;

#[async_trait]
impl Tool for VaultReadTool {
    fn name(&self) -> &str {
        "vault_read"
    }

    fn description(&self) -> &str {
        "Read a note from the vault by its relative path"
    }

    fn args_schema(&self) -> Value {
        input_schema::<ReadArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: ReadArgs = parse_args(args)?;
        let path = require_text("path", &input.path)?;
        let content = ctx.store().read(path).map_err(vault_error)?;
        if content.trim().is_empty() {
            return Ok(format!("{path} is empty"));
        }
        Ok(content)
    }
}

/// Tool for creating, overwriting, or appending to a document.
#[derive(Debug, Default)]
pub struct VaultWriteTool;

#[async_trait]
impl Tool for VaultWriteTool {
    fn name(&self) -> &str {
        "vault_write"
    }

    fn description(&self) -> &str {
        "Create or update a note. Overwrites keep the previous content as a restorable version; append adds to the end"
    }

    fn args_schema(&self) -> Value {
        input_schema::<WriteArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: WriteArgs = parse_args(args)?;
        let path = require_text("path", &input.path)?;
        let mode = parse_mode(input.mode.as_deref())?;
        let receipt = ctx
            .services
            .keeper
            .write(path, &input.content, mode)
            .map_err(vault_error)?;
        ctx.index_document(&receipt.path);

        Ok(match (receipt.mode, receipt.snapshot) {
            (WriteMode::Append, _) => format!(
                "Appended {} bytes to {}",
                receipt.bytes_written, receipt.path
            ),
            (WriteMode::Overwrite, Some(snapshot)) => format!(
                "Wrote {} bytes to {} (previous content saved as version {})",
                receipt.bytes_written, receipt.path, snapshot
            ),
            (WriteMode::Overwrite, None) => format!(
                "Created {} ({} bytes)",
                receipt.path, receipt.bytes_written
            ),
        })
    }
}

/// Tool for listing documents under a folder.
#[derive(Debug, Default)]
pub struct VaultListTool;

#[async_trait]
impl Tool for VaultListTool {
    fn name(&self) -> &str {
        "vault_list"
    }

    fn description(&self) -> &str {
        "List notes in the vault, optionally below a folder"
    }

    fn args_schema(&self) -> Value {
        input_schema::<ListArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: ListArgs = parse_args(args)?;
        let folder = input.folder.as_deref().unwrap_or("").trim();
        let entries = ctx.store().list(folder).map_err(vault_error)?;
        let label = if folder.is_empty() {
            "the vault".to_string()
        } else {
            folder.to_string()
        };
        if entries.is_empty() {
            return Ok(format!("No notes in {label}"));
        }

        let mut lines = vec![format!("{} notes in {label}:", entries.len())];
        for entry in entries.iter().take(MAX_LISTED) {
            lines.push(format!(
                "- {} ({} bytes, modified {})",
                entry.path,
                entry.size,
                entry.modified.format("%Y-%m-%d %H:%M")
            ));
        }
        if entries.len() > MAX_LISTED {
            lines.push(format!("... and {} more", entries.len() - MAX_LISTED));
        }
        Ok(lines.join("\n"))
    }
}

/// Tool for renaming or relocating a document.
#[derive(Debug, Default)]
pub struct VaultMoveTool;

#[async_trait]
impl Tool for VaultMoveTool {
    fn name(&self) -> &str {
        "vault_move"
    }

    fn description(&self) -> &str {
        "Move or rename a note. Fails if the destination already exists or the note is in a protected folder"
    }

    fn args_schema(&self) -> Value {
        input_schema::<MoveArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: MoveArgs = parse_args(args)?;
        let from = require_text("from", &input.from)?;
        let to = require_text("to", &input.to)?;
        ctx.services
            .trash
            .move_document(from, to)
            .map_err(vault_error)?;
        ctx.index_document(to);
        Ok(format!("Moved {from} to {to}"))
    }
}

/// Tool for reversible deletes through the trash.
#[derive(Debug, Default)]
pub struct VaultDeleteTool;

#[async_trait]
impl Tool for VaultDeleteTool {
    fn name(&self) -> &str {
        "vault_delete"
    }

    fn description(&self) -> &str {
        "Delete a note by moving it to the trash. Protected folders cannot be deleted"
    }

    fn args_schema(&self) -> Value {
        input_schema::<DeleteArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: DeleteArgs = parse_args(args)?;
        let path = require_text("path", &input.path)?;
        let entry = ctx.services.trash.soft_delete(path).map_err(vault_error)?;
        info!(
            "deleted note via tool (path={}, trash_path={})",
            entry.original_path, entry.trash_path
        );
        Ok(format!(
            "Moved {} to the trash ({})",
            entry.original_path, entry.trash_path
        ))
    }
}

fn parse_mode(mode: Option<&str>) -> Result<WriteMode, ToolError> {
    match mode.map(|mode| mode.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("overwrite") => Ok(WriteMode::Overwrite),
        Some("append") => Ok(WriteMode::Append),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "mode must be overwrite or append, got {other:?}"
        ))),
    }
}

/// Arguments for VaultReadTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct ReadArgs {
    #[input(description = "Relative path of the note, e.g. projects/garden.md.")]
    path: String,
}

/// Arguments for VaultWriteTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct WriteArgs {
    #[input(description = "Relative path of the note to write.")]
    path: String,
    #[input(description = "Text to write.")]
    content: String,
    #[input(description = "Either overwrite (default) or append.")]
    #[serde(default)]
    mode: Option<String>,
}

/// Arguments for VaultListTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct ListArgs {
    #[input(description = "Folder to list; omit for the whole vault.")]
    #[serde(default)]
    folder: Option<String>,
}

/// Arguments for VaultMoveTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct MoveArgs {
    #[input(description = "Current relative path of the note.")]
    from: String,
    #[input(description = "New relative path of the note.")]
    to: String,
}

/// Arguments for VaultDeleteTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct DeleteArgs {
    #[input(description = "Relative path of the note to delete.")]
    path: String,
}
