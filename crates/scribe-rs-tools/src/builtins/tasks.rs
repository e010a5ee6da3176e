//! Built-in task checklist tools.
//!
//! Tasks live in one markdown file as `- [ ] text` / `- [x] text` lines.
//! Other lines in the file are preserved untouched.

use crate::builtins::utils::{empty_schema, input_schema, parse_args, require_text, vault_error};
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use autoagents_derive::ToolInput;
use log::debug;
use regex::Regex;
use scribe_rs_protocol::ToolError;
use scribe_rs_vault::{VaultError, WriteMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TASK_PATTERN: &str = r"^(\s*[-*]\s+)\[([ xX])\]\s+(.*)$";

/// One checklist line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TaskLine {
    /// Zero-based line number in the file.
    line: usize,
    done: bool,
    text: String,
}

/// Tool adding an open task to the checklist.
#[derive(Debug, Default)]
pub struct TaskAddTool;

#[async_trait]
impl Tool for TaskAddTool {
    fn name(&self) -> &str {
        "task_add"
    }

    fn description(&self) -> &str {
        "Add a task to the to-do checklist"
    }

    fn args_schema(&self) -> Value {
        input_schema::<TaskAddArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: TaskAddArgs = parse_args(args)?;
        let text = require_text("text", &input.text)?
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let existing = read_checklist(ctx)?;
        let total = parse_tasks(&existing)?.len() + 1;
        let separator = if existing.is_empty() || existing.ends_with('\n') {
            ""
        } else {
            "\n"
        };
        let tasks_file = &ctx.services.tasks_file;
        ctx.services
            .keeper
            .write(
                tasks_file,
                &format!("{separator}- [ ] {text}\n"),
                WriteMode::Append,
            )
            .map_err(vault_error)?;
        ctx.index_document(tasks_file);
        debug!("added task (tasks_file={}, total={})", tasks_file, total);
        Ok(format!("Added task: \"{text}\" ({total} total)"))
    }
}

/// Tool listing checklist tasks with their numbers.
#[derive(Debug, Default)]
pub struct TaskListTool;

#[async_trait]
impl Tool for TaskListTool {
    fn name(&self) -> &str {
        "task_list"
    }

    fn description(&self) -> &str {
        "List tasks on the to-do checklist with their numbers"
    }

    fn args_schema(&self) -> Value {
        empty_schema()
    }

    async fn call(&self, ctx: &ToolContext, _args: Value) -> Result<String, ToolError> {
        let tasks = parse_tasks(&read_checklist(ctx)?)?;
        if tasks.is_empty() {
            return Ok("No tasks yet".to_string());
        }
        let done = tasks.iter().filter(|task| task.done).count();
        let mut lines = vec![format!("{} open, {} done:", tasks.len() - done, done)];
        for (idx, task) in tasks.iter().enumerate() {
            let mark = if task.done { "x" } else { " " };
            lines.push(format!("{}. [{}] {}", idx + 1, mark, task.text));
        }
        Ok(lines.join("\n"))
    }
}

/// Tool flipping a task between open and done.
#[derive(Debug, Default)]
pub struct TaskToggleTool;

#[async_trait]
impl Tool for TaskToggleTool {
    fn name(&self) -> &str {
        "task_toggle"
    }

    fn description(&self) -> &str {
        "Mark a task done, or reopen it if it is already done. Use the number shown by task_list"
    }

    fn args_schema(&self) -> Value {
        input_schema::<TaskToggleArgs>()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
        let input: TaskToggleArgs = parse_args(args)?;
        let index = input
            .index
            .ok_or_else(|| ToolError::InvalidArguments("index is required".to_string()))?;
        let content = read_checklist(ctx)?;
        let tasks = parse_tasks(&content)?;
        let task = index
            .checked_sub(1)
            .and_then(|idx| tasks.get(idx))
            .ok_or_else(|| {
                ToolError::InvalidArguments(format!(
                    "task {index} does not exist ({} tasks)",
                    tasks.len()
                ))
            })?;

        let pattern = task_pattern()?;
        let mut lines = content.lines().map(str::to_string).collect::<Vec<_>>();
        let Some(line) = lines.get_mut(task.line) else {
            return Err(ToolError::ExecutionFailed(
                "checklist changed while reading".to_string(),
            ));
        };
        let mark = if task.done { " " } else { "x" };
        *line = pattern
            .replace(line.as_str(), format!("${{1}}[{mark}] ${{3}}").as_str())
            .into_owned();
        let mut updated = lines.join("\n");
        if content.ends_with('\n') {
            updated.push('\n');
        }

        let tasks_file = &ctx.services.tasks_file;
        ctx.services
            .keeper
            .write(tasks_file, &updated, WriteMode::Overwrite)
            .map_err(vault_error)?;
        ctx.index_document(tasks_file);
        Ok(if task.done {
            format!("Reopened task {index}: \"{}\"", task.text)
        } else {
            format!("Marked task {index} done: \"{}\"", task.text)
        })
    }
}

fn task_pattern() -> Result<Regex, ToolError> {
    Regex::new(TASK_PATTERN)
        .map_err(|err| ToolError::ExecutionFailed(format!("invalid task pattern: {err}")))
}

/// Checklist content; a missing file is an empty list.
fn read_checklist(ctx: &ToolContext) -> Result<String, ToolError> {
    match ctx.store().read(&ctx.services.tasks_file) {
        Ok(content) => Ok(content),
        Err(VaultError::NotFound(_)) => Ok(String::new()),
        Err(err) => Err(vault_error(err)),
    }
}

fn parse_tasks(content: &str) -> Result<Vec<TaskLine>, ToolError> {
    let pattern = task_pattern()?;
    Ok(content
        .lines()
        .enumerate()
        .filter_map(|(line, text)| {
            let captures = pattern.captures(text)?;
            Some(TaskLine {
                line,
                done: !captures.get(2)?.as_str().trim().is_empty(),
                text: captures.get(3)?.as_str().trim().to_string(),
            })
        })
        .collect())
}

/// Arguments for TaskAddTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct TaskAddArgs {
    #[input(description = "What needs doing, e.g. \"call Farhan\".")]
    text: String,
}

/// Arguments for TaskToggleTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct TaskToggleArgs {
    #[input(description = "Task number as shown by task_list (starting at 1).")]
    #[serde(default)]
    index: Option<usize>,
}
