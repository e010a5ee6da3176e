//! Sandboxed, versioned document vault.
//!
//! [`VaultStore`] confines every read and write to one root directory,
//! [`VersionKeeper`] snapshots a document before each overwrite, and
//! [`Trash`] turns deletes into moves.

pub mod error;
mod path;
pub mod store;
pub mod trash;
pub mod versions;

/// Vault error type.
pub use error::VaultError;
/// Checked vault path.
pub use path::VaultPath;
/// Sandboxed store and listing entries.
pub use store::{DocumentEntry, VaultStore};
/// Soft delete support.
pub use trash::{Trash, TrashEntry};
/// Versioned writes and restore.
pub use versions::{RestoreReceipt, VersionEntry, VersionKeeper, WriteMode, WriteReceipt};
