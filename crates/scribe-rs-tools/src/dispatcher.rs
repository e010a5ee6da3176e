//! Tool dispatcher: name + input in, `(text, success)` out.
//!
//! Nothing a tool does can escape [`ToolDispatcher::execute`]: errors and
//! panics alike become a failed [`ToolOutcome`] the model can read.

use crate::context::ToolContext;
use crate::policy::ToolPolicyMatcher;
use crate::registry::ToolRegistry;
use crate::tool::ToolSpec;
use futures_util::FutureExt;
use log::{debug, info, warn};
use scribe_rs_config::ToolsConfig;
use scribe_rs_protocol::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use uuid::Uuid;

/// Default cap on tool result text, in characters.
pub const DEFAULT_MAX_RESULT_CHARS: usize = 16 * 1024;

/// Normalized outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub text: String,
    pub success: bool,
}

impl ToolOutcome {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
        }
    }
}

/// Routes invocations to registered tools.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: ToolRegistry,
    context: ToolContext,
    policy: ToolPolicyMatcher,
    max_result_chars: usize,
}

impl ToolDispatcher {
    /// Dispatcher allowing every registered tool.
    pub fn new(registry: ToolRegistry, context: ToolContext) -> Result<Self, ToolError> {
        Ok(Self {
            registry,
            context,
            policy: ToolPolicyMatcher::allow_all()?,
            max_result_chars: DEFAULT_MAX_RESULT_CHARS,
        })
    }

    /// Dispatcher configured from the `tools` config section.
    pub fn from_config(
        registry: ToolRegistry,
        context: ToolContext,
        config: &ToolsConfig,
    ) -> Result<Self, ToolError> {
        let dispatcher = Self {
            registry,
            context,
            policy: ToolPolicyMatcher::compile(&config.policy)?,
            max_result_chars: config.max_result_chars,
        };
        info!(
            "initialized tool dispatcher (tools={}, allowed={})",
            dispatcher.registry.len(),
            dispatcher.catalog().len()
        );
        Ok(dispatcher)
    }

    pub fn with_policy(mut self, policy: ToolPolicyMatcher) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_result_chars(mut self, max_result_chars: usize) -> Self {
        self.max_result_chars = max_result_chars;
        self
    }

    /// Copy of this dispatcher whose tool contexts carry `turn_id`.
    pub fn for_turn(&self, turn_id: Uuid) -> Self {
        let mut dispatcher = self.clone();
        dispatcher.context.turn_id = Some(turn_id);
        dispatcher
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Policy-filtered tool specs, sorted by name.
    pub fn catalog(&self) -> Vec<ToolSpec> {
        self.registry
            .specs()
            .into_iter()
            .filter(|spec| self.policy.is_allowed(&spec.name))
            .collect()
    }

    /// Run one invocation. Never fails and never panics.
    pub async fn execute(&self, name: &str, input: Value) -> ToolOutcome {
        debug!(
            "dispatching tool (name={}, turn_id={:?})",
            name, self.context.turn_id
        );
        let outcome = match self.try_execute(name, input).await {
            Ok(text) => ToolOutcome::ok(text),
            Err(err) => {
                warn!(
                    "tool failed (name={}, kind={}, turn_id={:?}): {}",
                    name,
                    err.kind(),
                    self.context.turn_id,
                    err
                );
                ToolOutcome::failed(describe_error(name, &err))
            }
        };
        ToolOutcome {
            text: truncate_chars(outcome.text, self.max_result_chars),
            success: outcome.success,
        }
    }

    async fn try_execute(&self, name: &str, input: Value) -> Result<String, ToolError> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;
        if !self.policy.is_allowed(name) {
            return Err(ToolError::PermissionDenied(format!(
                "tool {name} is disabled by policy"
            )));
        }
        if !input.is_object() {
            return Err(ToolError::InvalidArguments(
                "tool input must be a JSON object".to_string(),
            ));
        }

        let mut ctx = self.context.clone();
        ctx.tool_name = Some(name.to_string());
        match AssertUnwindSafe(tool.call(&ctx, input)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ToolError::ExecutionFailed(format!(
                "tool panicked: {}",
                panic_message(&*panic)
            ))),
        }
    }
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("tools", &self.registry.list())
            .field("max_result_chars", &self.max_result_chars)
            .finish()
    }
}

/// Model-facing failure text.
fn describe_error(name: &str, err: &ToolError) -> String {
    match err {
        ToolError::ToolNotFound(_) => err.to_string(),
        _ => format!("{name} failed: {err}"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    let mut kept = text.chars().take(max_chars).collect::<String>();
    kept.push_str(&format!("\n[truncated {} characters]", total - max_chars));
    kept
}
