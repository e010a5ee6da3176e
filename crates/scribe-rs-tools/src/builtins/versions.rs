//! Built-in version history tools.

use crate::builtins::utils::{input_schema, parse_args, require_text, vault_error};
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use autoagents_derive::ToolInput;
use scribe_rs_protocol::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool listing the saved versions of a document.
#[derive(Debug, Default)]
pub struct VersionListTool;

#[async_trait]
impl Tool for VersionListTool {
    fn name(&self) -> &str {
        "version_list"
    }

    fn description(&self) -> &str {
        "List earlier versions of a note, newest first"
    }

    fn args_schema(&self) -> Value {
        input_schema::<VersionListArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: VersionListArgs = parse_args(args)?;
        let path = require_text("path", &input.path)?;
        let versions = ctx
            .services
            .keeper
            .list_versions(path)
            .map_err(vault_error)?;
        if versions.is_empty() {
            return Ok(format!("No saved versions of {path}"));
        }
        let mut lines = vec![format!(
            "{} versions of {path} (newest first):",
            versions.len()
        )];
        lines.extend(
            versions
                .iter()
                .map(|version| format!("- {} ({} bytes)", version.id, version.size)),
        );
        Ok(lines.join("\n"))
    }
}

/// Tool restoring a document to an earlier version.
#[derive(Debug, Default)]
pub struct VersionRestoreTool;

#[async_trait]
impl Tool for VersionRestoreTool {
    fn name(&self) -> &str {
        "version_restore"
    }

    fn description(&self) -> &str {
        "Restore a note to an earlier version. The current content is saved first, so a restore can be undone. Partial version ids are accepted"
    }

    fn args_schema(&self) -> Value {
        input_schema::<VersionRestoreArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: VersionRestoreArgs = parse_args(args)?;
        let path = require_text("path", &input.path)?;
        let version = require_text("version", &input.version)?;
        let receipt = ctx
            .services
            .keeper
            .restore(path, version)
            .map_err(vault_error)?;
        ctx.index_document(&receipt.path);
        Ok(match receipt.backup {
            Some(backup) => format!(
                "Restored {} to version {} (previous content saved as version {})",
                receipt.path, receipt.restored, backup
            ),
            None => format!("Restored {} to version {}", receipt.path, receipt.restored),
        })
    }
}

/// Arguments for VersionListTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct VersionListArgs {
    #[input(description = "Relative path of the note.")]
    path: String,
}

/// Arguments for VersionRestoreTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct VersionRestoreArgs {
    #[input(description = "Relative path of the note.")]
    path: String,
    #[input(description = "Version id from version_list, or a unique part of it.")]
    version: String,
}
