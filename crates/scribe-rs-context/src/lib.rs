//! Advisory vault context for prompt construction.
//!
//! Providers rank document excerpts for a free-text query. Results only ever
//! decorate a prompt; nothing downstream branches on them.

pub mod error;
pub mod index;
pub mod model;
pub mod provider;

/// Context error type.
pub use error::ContextError;
/// Background indexing queue.
pub use index::{IndexQueue, IndexStats};
/// Excerpt and query-kind models.
pub use model::{ContextExcerpt, ContextKind};
/// Provider interface and the built-in strategies.
pub use provider::{
    ContextProvider, KeywordContextProvider, SemanticContextProvider, SemanticSearch,
};
