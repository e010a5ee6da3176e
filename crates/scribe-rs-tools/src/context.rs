//! Tool execution context and the services tools act on.

use crate::collaborator::CollaboratorSet;
use log::{debug, info, warn};
use scribe_rs_config::{ContextStrategy, ScribeConfig};
use scribe_rs_context::{
    ContextProvider, IndexQueue, KeywordContextProvider, SemanticContextProvider, SemanticSearch,
};
use scribe_rs_vault::{Trash, VaultStore, VersionKeeper};
use std::sync::Arc;
use uuid::Uuid;

/// Shared service dependencies (constructed once, shared via Arc).
pub struct ToolServices {
    /// Versioned writes over the vault store.
    pub keeper: VersionKeeper,
    /// Soft delete.
    pub trash: Trash,
    /// Search backend for `vault_search`.
    pub context: Arc<dyn ContextProvider>,
    /// External integrations.
    pub collaborators: CollaboratorSet,
    /// Optional post-write indexing queue.
    pub index_queue: Option<Arc<IndexQueue>>,
    /// Vault-relative path of the task checklist.
    pub tasks_file: String,
}

impl ToolServices {
    /// Services over `store` with keyword search and no collaborators.
    pub fn new(
        store: VaultStore,
        protected_prefixes: Vec<String>,
        tasks_file: impl Into<String>,
    ) -> Self {
        let tasks_file = tasks_file.into();
        let context = Arc::new(KeywordContextProvider::new(store.clone(), tasks_file.clone()));
        Self {
            keeper: VersionKeeper::new(store.clone()),
            trash: Trash::new(store, protected_prefixes),
            context,
            collaborators: CollaboratorSet::new(),
            index_queue: None,
            tasks_file,
        }
    }

    /// Services wired from the vault and context sections of `config`.
    ///
    /// `semantic` backs the semantic strategy and feeds an index queue of
    /// `context.index_queue_capacity` jobs. Without it the keyword provider is
    /// used. Must run inside a tokio runtime when `semantic` is given.
    pub fn from_config(
        store: VaultStore,
        config: &ScribeConfig,
        semantic: Option<Arc<dyn SemanticSearch>>,
    ) -> Self {
        let services = Self::new(
            store.clone(),
            config.vault.protected_prefixes.clone(),
            config.vault.tasks_file.clone(),
        );
        let Some(service) = semantic else {
            if config.context.strategy == ContextStrategy::Semantic {
                warn!("semantic context configured without a search service; using keyword search");
            }
            return services;
        };

        let queue = IndexQueue::spawn(service.clone(), config.context.index_queue_capacity);
        let services = services.with_index_queue(Arc::new(queue));
        match config.context.strategy {
            ContextStrategy::Semantic => {
                info!("using semantic context provider");
                let fallback = KeywordContextProvider::new(store, services.tasks_file.clone());
                services.with_context_provider(Arc::new(SemanticContextProvider::new(
                    service, fallback,
                )))
            }
            ContextStrategy::Keyword => services,
        }
    }

    pub fn with_context_provider(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = context;
        self
    }

    pub fn with_collaborators(mut self, collaborators: CollaboratorSet) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn with_index_queue(mut self, queue: Arc<IndexQueue>) -> Self {
        self.index_queue = Some(queue);
        self
    }

    /// Underlying vault store.
    pub fn store(&self) -> &VaultStore {
        self.keeper.store()
    }
}

/// Context passed to tools during execution.
///
/// Cloning is a reference-count bump on the shared services.
#[derive(Clone)]
pub struct ToolContext {
    /// Turn the invocation belongs to, when run by the orchestrator.
    pub turn_id: Option<Uuid>,
    /// Tool name for the current invocation.
    pub tool_name: Option<String>,
    pub services: Arc<ToolServices>,
}

impl ToolContext {
    pub fn new(services: ToolServices) -> Self {
        Self {
            turn_id: None,
            tool_name: None,
            services: Arc::new(services),
        }
    }

    pub fn store(&self) -> &VaultStore {
        self.services.store()
    }

    /// Queue a freshly written document for indexing. Never fails the caller.
    pub fn index_document(&self, path: &str) {
        let Some(queue) = self.services.index_queue.as_ref() else {
            return;
        };
        match self.store().read(path) {
            Ok(content) => {
                queue.enqueue(path, content);
            }
            Err(err) => debug!("skipping index of unreadable document (path={path}): {err}"),
        }
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("turn_id", &self.turn_id)
            .field("tool_name", &self.tool_name)
            .field("root", &self.store().root())
            .finish()
    }
}
