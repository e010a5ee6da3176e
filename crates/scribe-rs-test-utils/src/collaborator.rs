use async_trait::async_trait;
use parking_lot::Mutex;
use scribe_rs_tools::{Collaborator, CollaboratorResponse};
use serde_json::Value;
use std::sync::Arc;

/// Collaborator that accepts everything and keeps the payloads.
#[derive(Debug, Clone, Default)]
pub struct RecordingCollaborator {
    pub payloads: Arc<Mutex<Vec<Value>>>,
}

impl RecordingCollaborator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Collaborator for RecordingCollaborator {
    async fn send(&self, payload: Value) -> CollaboratorResponse {
        self.payloads.lock().push(payload);
        CollaboratorResponse::ok(Value::String("delivered".to_string()))
    }
}
