//! Vault-relative path normalization and containment checks.

use crate::error::VaultError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Folder holding version snapshots.
pub(crate) const VERSIONS_DIR: &str = ".versions";
/// Folder holding soft-deleted documents.
pub(crate) const TRASH_DIR: &str = ".trash";

/// A checked vault path: the normalized relative form plus its absolute location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPath {
    relative: String,
    absolute: PathBuf,
}

impl VaultPath {
    /// Normalized forward-slash relative path (empty for the root itself).
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Absolute location under the vault root.
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Parent folder in relative form, empty at the top level.
    pub fn folder(&self) -> &str {
        self.relative
            .rsplit_once('/')
            .map(|(folder, _)| folder)
            .unwrap_or("")
    }

    /// Final path segment.
    pub fn file_name(&self) -> &str {
        self.relative
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.relative)
    }
}

/// Lexically normalize a vault-relative path into its segments.
///
/// Runs before any filesystem access: absolute paths and any `..` segment
/// fail with `PathEscape`, `.` and empty segments are dropped.
pub(crate) fn normalize_segments(input: &str) -> Result<Vec<String>, VaultError> {
    if input.contains('\0') {
        return Err(VaultError::InvalidPath("path contains NUL".to_string()));
    }
    let path = Path::new(input);
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::CurDir => (),
            Component::ParentDir => return Err(VaultError::PathEscape(input.to_string())),
            Component::Prefix(_) | Component::RootDir => {
                return Err(VaultError::PathEscape(input.to_string()));
            }
        }
    }
    Ok(parts)
}

/// Resolve a document or folder path under `root` without touching the disk.
///
/// `allow_root` permits the empty path (used by `list`). Reserved bookkeeping
/// folders are refused so tools cannot edit snapshots or trash directly.
pub(crate) fn resolve_lexical(
    root: &Path,
    input: &str,
    allow_root: bool,
) -> Result<VaultPath, VaultError> {
    let parts = normalize_segments(input.trim())?;
    if parts.is_empty() && !allow_root {
        return Err(VaultError::InvalidPath("path cannot be empty".to_string()));
    }
    if let Some(first) = parts.first()
        && (first == VERSIONS_DIR || first == TRASH_DIR)
    {
        return Err(VaultError::InvalidPath(format!("{first} is reserved")));
    }

    let mut absolute = root.to_path_buf();
    for part in &parts {
        absolute.push(part);
    }
    Ok(VaultPath {
        relative: parts.join("/"),
        absolute,
    })
}

/// Ensure the nearest existing entry for `path` still resolves under `root`.
///
/// Catches symlinks pointing out of the vault, including dangling ones,
/// which a later write would follow; `root` must be canonical.
pub(crate) fn ensure_within_root(root: &Path, path: &VaultPath) -> Result<(), VaultError> {
    let escape = || VaultError::PathEscape(path.relative().to_string());
    let existing = find_existing_entry(path.absolute()).ok_or_else(escape)?;
    let target = match existing.canonicalize() {
        Ok(target) => target,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(escape()),
        Err(err) => return Err(err.into()),
    };
    if !target.starts_with(root) {
        return Err(VaultError::PathEscape(path.relative().to_string()));
    }
    Ok(())
}

/// Whether `relative` falls under any protected prefix.
pub(crate) fn is_protected(relative: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        let prefix = prefix.trim().trim_start_matches("./").trim_end_matches('/');
        !prefix.is_empty()
            && (relative == prefix
                || relative
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/')))
    })
}

/// Find the nearest path with a directory entry, without following links.
fn find_existing_entry(path: &Path) -> Option<&Path> {
    let mut current = Some(path);
    while let Some(candidate) = current {
        if fs::symlink_metadata(candidate).is_ok() {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}
