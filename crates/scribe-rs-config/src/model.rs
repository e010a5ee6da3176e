//! Configuration schema for Scribe.

use serde::{Deserialize, Serialize};

/// Root config for the Scribe runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScribeConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

impl ScribeConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> ScribeConfigBuilder {
        ScribeConfigBuilder::new()
    }
}

/// Builder for assembling a `ScribeConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct ScribeConfigBuilder {
    config: ScribeConfig,
}

impl ScribeConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: ScribeConfig::default(),
        }
    }

    /// Replace the vault configuration.
    pub fn vault(mut self, vault: VaultConfig) -> Self {
        self.config.vault = vault;
        self
    }

    /// Replace the orchestrator configuration.
    pub fn orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.config.orchestrator = orchestrator;
        self
    }

    /// Replace the tool configuration.
    pub fn tools(mut self, tools: ToolsConfig) -> Self {
        self.config.tools = tools;
        self
    }

    /// Replace the context configuration.
    pub fn context(mut self, context: ContextConfig) -> Self {
        self.config.context = context;
        self
    }

    /// Finalize and return the built `ScribeConfig`.
    pub fn build(self) -> ScribeConfig {
        self.config
    }
}

/// Location and protection rules for the document vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Sandbox root. Relative paths resolve against the process cwd.
    #[serde(default)]
    pub root: Option<String>,
    /// Path prefixes that can never be soft-deleted.
    #[serde(default = "default_protected_prefixes")]
    pub protected_prefixes: Vec<String>,
    /// Markdown checklist used by the task tools.
    #[serde(default = "default_tasks_file")]
    pub tasks_file: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: None,
            protected_prefixes: default_protected_prefixes(),
            tasks_file: default_tasks_file(),
        }
    }
}

fn default_protected_prefixes() -> Vec<String> {
    vec!["journal/".to_string()]
}

fn default_tasks_file() -> String {
    "tasks.md".to_string()
}

/// Conversation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Ceiling on model calls per turn.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// Extra instructions appended to the base system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Number of context excerpts to add to the prompt; 0 disables.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
    /// Output budget hint forwarded to model adapters.
    #[serde(default)]
    pub max_tokens_hint: Option<u32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            system_prompt: None,
            context_limit: default_context_limit(),
            max_tokens_hint: None,
        }
    }
}

fn default_max_rounds() -> usize {
    10
}

fn default_context_limit() -> usize {
    5
}

/// Tool allow/deny policy, matched as glob patterns on tool names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolPolicy {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

impl ToolPolicy {
    /// Build a policy that allows all tools.
    pub fn allow_all() -> Self {
        Self {
            allow: vec!["*".to_string()],
            deny: Vec::new(),
        }
    }
}

impl Default for ToolPolicy {
    fn default() -> Self {
        Self::allow_all()
    }
}

/// Global tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub policy: ToolPolicy,
    /// Longer result text is cut and marked as truncated.
    #[serde(default = "default_max_result_chars")]
    pub max_result_chars: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            policy: ToolPolicy::default(),
            max_result_chars: default_max_result_chars(),
        }
    }
}

fn default_max_result_chars() -> usize {
    16 * 1024
}

/// Which Context Provider strategy to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContextStrategy {
    /// Local keyword scan of the vault.
    #[default]
    Keyword,
    /// External semantic search with keyword fallback.
    Semantic,
}

/// Context Provider and background indexing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub strategy: ContextStrategy,
    #[serde(default = "default_index_queue_capacity")]
    pub index_queue_capacity: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            strategy: ContextStrategy::default(),
            index_queue_capacity: default_index_queue_capacity(),
        }
    }
}

fn default_index_queue_capacity() -> usize {
    64
}
