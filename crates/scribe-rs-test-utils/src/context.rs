use scribe_rs_tools::{ToolContext, ToolServices};
use scribe_rs_vault::VaultStore;
use std::path::Path;

/// Services over a vault at `root` with `journal/` protected.
pub fn base_tool_services(root: &Path) -> ToolServices {
    let store = VaultStore::open(root).unwrap_or_else(|err| panic!("open vault: {err}"));
    ToolServices::new(store, vec!["journal/".to_string()], "tasks.md")
}

pub fn base_tool_context(root: &Path) -> ToolContext {
    ToolContext::new(base_tool_services(root))
}
