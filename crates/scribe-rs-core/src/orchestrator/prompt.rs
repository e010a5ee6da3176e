//! System prompt assembly for a conversation turn.

use log::{debug, warn};
use scribe_rs_context::{ContextExcerpt, ContextKind, ContextProvider};
use std::sync::Arc;

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

const BASE_INSTRUCTIONS: &str = "You are Scribe, an assistant that manages the user's notes and tasks.\n\
Use the provided tools to read, write, search, and organise documents in the vault.\n\
Every overwrite keeps the previous content as a version, and deletes go to the trash, so \
mistakes can be undone with version_restore.\n\
When a tool fails, read its message and either try a different approach or tell the user \
plainly what went wrong. Keep replies short.";

/// Builds system prompts from base instructions, configured extras, and
/// vault context for the latest user request.
#[derive(Clone, Default)]
pub struct PromptBuilder {
    /// Extra instructions from config.
    extra_instructions: Option<String>,
    /// Optional context source used to decorate the prompt.
    context_provider: Option<Arc<dyn ContextProvider>>,
    /// Number of excerpts to include; 0 disables the section.
    context_limit: usize,
}

impl PromptBuilder {
    pub fn new(
        extra_instructions: Option<String>,
        context_provider: Option<Arc<dyn ContextProvider>>,
        context_limit: usize,
    ) -> Self {
        Self {
            extra_instructions,
            context_provider,
            context_limit,
        }
    }

    /// Build the system prompt for a turn whose latest user text is `query`.
    ///
    /// Context is advisory: a failing provider only drops its section.
    pub async fn build_system_prompt(&self, query: &str) -> String {
        let mut sections = vec![BASE_INSTRUCTIONS.to_string()];
        if let Some(extra) = self.extra_instructions.as_deref().map(str::trim) {
            if !extra.is_empty() {
                sections.push(extra.to_string());
            }
        }
        if let Some(context) = self.context_section(query).await {
            sections.push(context);
        }
        sections.join(SECTION_SEPARATOR)
    }

    async fn context_section(&self, query: &str) -> Option<String> {
        let provider = self.context_provider.as_ref()?;
        if self.context_limit == 0 || query.trim().is_empty() {
            return None;
        }
        match provider
            .search(query, ContextKind::All, self.context_limit)
            .await
        {
            Ok(excerpts) if excerpts.is_empty() => None,
            Ok(excerpts) => {
                debug!("decorating prompt with context (excerpts={})", excerpts.len());
                Some(format_context(&excerpts))
            }
            Err(err) => {
                warn!("context lookup failed, continuing without it: {}", err);
                None
            }
        }
    }
}

fn format_context(excerpts: &[ContextExcerpt]) -> String {
    let mut section = String::from("## Vault context\n\nPossibly relevant excerpts. They may be stale; read the document before relying on it.");
    for excerpt in excerpts {
        section.push_str(&format!(
            "\n\n### {} (relevance {:.2})\n{}",
            excerpt.path,
            excerpt.score,
            excerpt.excerpt.trim()
        ));
    }
    section
}
