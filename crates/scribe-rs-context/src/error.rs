//! Error types for context lookup and indexing.

use scribe_rs_vault::VaultError;

/// Errors returned by context providers and the index queue.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// Vault access failed while scanning documents.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),
    /// The external semantic-search service failed.
    #[error("search error: {0}")]
    Search(String),
    /// The index queue no longer accepts work.
    #[error("index queue closed")]
    QueueClosed,
}
