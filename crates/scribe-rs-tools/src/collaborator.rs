//! Envelope for external side-effecting integrations (messaging, email, workflows).

use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Well-known collaborator name for workflow triggers.
pub const WORKFLOW_COLLABORATOR: &str = "workflow";

/// Reply from a collaborator. Either `data` or `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaboratorResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CollaboratorResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// A single external integration.
///
/// Implementations own their wire format; the dispatcher only sees the
/// payload it built and the envelope that comes back.
#[async_trait]
pub trait Collaborator: Send + Sync {
    async fn send(&self, payload: Value) -> CollaboratorResponse;
}

/// Named collaborators available to tools.
#[derive(Default, Clone)]
pub struct CollaboratorSet {
    entries: Arc<RwLock<HashMap<String, Arc<dyn Collaborator>>>>,
}

impl CollaboratorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collaborator under `name`.
    pub fn register(&self, name: impl Into<String>, collaborator: Arc<dyn Collaborator>) {
        let name = name.into();
        debug!("registering collaborator (name={})", name);
        self.entries.write().insert(name, collaborator);
    }

    /// Builder-style variant of [`CollaboratorSet::register`].
    pub fn with(self, name: impl Into<String>, collaborator: Arc<dyn Collaborator>) -> Self {
        self.register(name, collaborator);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Collaborator>> {
        self.entries.read().get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.entries.read().keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }
}

impl std::fmt::Debug for CollaboratorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollaboratorSet")
            .field("names", &self.names())
            .finish()
    }
}
