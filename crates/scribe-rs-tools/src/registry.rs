//! Registry for tool implementations.
//!
//! The catalog and dispatch are both served from this one map, so a catalog
//! entry without an implementation cannot exist.

use crate::tool::{Tool, ToolSpec};
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory registry for tool implementations.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    /// Map of tool name to implementation.
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool by name, replacing any earlier tool with that name.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        debug!("registering tool (name={})", tool.name());
        if let Some(previous) = self.tools.write().insert(tool.name().to_string(), tool) {
            warn!("replaced registered tool (name={})", previous.name());
        }
    }

    /// Fetch a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names = self.tools.read().keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }

    /// Tool specs for all registered tools, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs = self
            .tools
            .read()
            .values()
            .map(|tool| tool.spec())
            .collect::<Vec<_>>();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }
}

#[cfg(test)]
mod tests {
    use super::ToolRegistry;
    use crate::{Tool, ToolContext};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use scribe_rs_protocol::ToolError;
    use serde_json::json;
    use std::fmt;
    use std::sync::Arc;

    #[derive(Clone)]
    struct DummyTool {
        name: &'static str,
        reply: &'static str,
    }

    impl fmt::Debug for DummyTool {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "DummyTool({})", self.name)
        }
    }

    #[async_trait]
    impl Tool for DummyTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            self.reply
        }

        fn args_schema(&self) -> serde_json::Value {
            json!({})
        }

        async fn call(
            &self,
            _ctx: &ToolContext,
            _args: serde_json::Value,
        ) -> Result<String, ToolError> {
            Ok(self.reply.to_string())
        }
    }

    #[test]
    fn registry_tracks_tools_and_specs() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool {
            name: "vault_write",
            reply: "w",
        }));
        registry.register(Arc::new(DummyTool {
            name: "vault_read",
            reply: "r",
        }));

        assert_eq!(registry.list(), vec!["vault_read", "vault_write"]);
        let spec_names = registry
            .specs()
            .into_iter()
            .map(|spec| spec.name)
            .collect::<Vec<_>>();
        assert_eq!(spec_names, vec!["vault_read", "vault_write"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registering_same_name_replaces_tool() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool {
            name: "task_add",
            reply: "old",
        }));
        registry.register(Arc::new(DummyTool {
            name: "task_add",
            reply: "new",
        }));

        assert_eq!(registry.len(), 1);
        let tool = registry.get("task_add").expect("tool");
        assert_eq!(tool.description(), "new");
    }
}
