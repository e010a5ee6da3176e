//! Error types for vault operations.

use thiserror::Error;

/// Errors returned by the store, version keeper, and trash.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Path is absolute, contains `..`, or resolves outside the vault root.
    #[error("path escapes vault root: {0}")]
    PathEscape(String),
    /// Path is empty or targets a reserved folder.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// Path falls under a protected prefix and cannot be deleted.
    #[error("path is protected: {0}")]
    ProtectedPath(String),
    /// No snapshot matched the requested version.
    #[error("version not found for {path}: {version}")]
    VersionNotFound { path: String, version: String },
    /// Document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),
    /// Move target is already occupied.
    #[error("document already exists: {0}")]
    AlreadyExists(String),
    /// Operation expected a document but found a folder.
    #[error("path is a folder: {0}")]
    IsDirectory(String),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
