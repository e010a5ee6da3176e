//! Tool interfaces, the dispatcher, and built-in vault tools for Scribe.

pub mod builtins;
pub mod collaborator;
pub mod context;
pub mod dispatcher;
pub mod policy;
pub mod registry;
pub mod tool;

/// Built-in tool registry and registration helper.
pub use builtins::{builtin_tool_registry, register_builtin_tools};
/// External collaborator envelope.
pub use collaborator::{Collaborator, CollaboratorResponse, CollaboratorSet};
/// Tool execution context and shared services.
pub use context::{ToolContext, ToolServices};
/// Dispatcher and normalized outcome.
pub use dispatcher::{ToolDispatcher, ToolOutcome};
/// Compiled allow/deny policy.
pub use policy::ToolPolicyMatcher;
/// Tool registry type.
pub use registry::ToolRegistry;
/// Tool trait and spec type.
pub use tool::{Tool, ToolSpec};
