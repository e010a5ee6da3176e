//! Built-in vault search tool backed by the context provider.

use crate::builtins::utils::{input_schema, parse_args, require_text};
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use autoagents_derive::ToolInput;
use scribe_rs_context::ContextKind;
use scribe_rs_protocol::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: usize = 20;

/// Tool for ranked keyword or semantic search over the vault.
#[derive(Debug, Default)]
pub struct VaultSearchTool;

#[async_trait]
impl Tool for VaultSearchTool {
    fn name(&self) -> &str {
        "vault_search"
    }

    fn description(&self) -> &str {
        "Search notes and tasks for relevant passages. Results are ranked by relevance"
    }

    fn args_schema(&self) -> Value {
        input_schema::<SearchArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: SearchArgs = parse_args(args)?;
        let query = require_text("query", &input.query)?;
        let kind = input
            .kind
            .as_deref()
            .unwrap_or("")
            .parse::<ContextKind>()
            .map_err(ToolError::InvalidArguments)?;
        let limit = input.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let results = ctx
            .services
            .context
            .search(query, kind, limit)
            .await
            .map_err(|err| ToolError::ExecutionFailed(format!("search failed: {err}")))?;
        if results.is_empty() {
            return Ok(format!("No matches for \"{query}\""));
        }

        let blocks = results
            .iter()
            .enumerate()
            .map(|(idx, result)| {
                let excerpt = result
                    .excerpt
                    .lines()
                    .map(|line| format!("   {line}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "{}. {} (score {:.2})\n{}",
                    idx + 1,
                    result.path,
                    result.score,
                    excerpt
                )
            })
            .collect::<Vec<_>>();
        Ok(blocks.join("\n"))
    }
}

/// Arguments for VaultSearchTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct SearchArgs {
    #[input(description = "Words to search for.")]
    query: String,
    #[input(description = "One of all (default), notes, or tasks.")]
    #[serde(default)]
    kind: Option<String>,
    #[input(description = "Maximum number of results (default 5, at most 20).")]
    #[serde(default)]
    limit: Option<usize>,
}
