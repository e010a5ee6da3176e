//! Built-in tools bundled with Scribe.

mod messaging;
mod search;
mod tasks;
mod utils;
mod vault;
mod versions;

use crate::ToolRegistry;
use log::info;
use std::sync::Arc;

pub use messaging::{SendMessageTool, TriggerWorkflowTool};
pub use search::VaultSearchTool;
pub use tasks::{TaskAddTool, TaskListTool, TaskToggleTool};
pub use vault::{VaultDeleteTool, VaultListTool, VaultMoveTool, VaultReadTool, VaultWriteTool};
pub use versions::{VersionListTool, VersionRestoreTool};

/// Register all built-in tools with the provided registry.
pub fn register_builtin_tools(registry: &ToolRegistry) {
    registry.register(Arc::new(VaultReadTool));
    registry.register(Arc::new(VaultWriteTool));
    registry.register(Arc::new(VaultListTool));
    registry.register(Arc::new(VaultMoveTool));
    registry.register(Arc::new(VaultDeleteTool));
    registry.register(Arc::new(VersionListTool));
    registry.register(Arc::new(VersionRestoreTool));
    registry.register(Arc::new(VaultSearchTool));
    registry.register(Arc::new(TaskAddTool));
    registry.register(Arc::new(TaskListTool));
    registry.register(Arc::new(TaskToggleTool));
    registry.register(Arc::new(SendMessageTool));
    registry.register(Arc::new(TriggerWorkflowTool));
    info!("registered built-in tools (count={})", registry.len());
}

/// Build a registry pre-populated with built-in tools.
pub fn builtin_tool_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    register_builtin_tools(&registry);
    registry
}
