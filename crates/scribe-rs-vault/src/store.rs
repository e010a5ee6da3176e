//! Sandboxed document store rooted at a single directory.

use crate::error::VaultError;
use crate::path::{VaultPath, ensure_within_root, resolve_lexical};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Listing entry for a single document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentEntry {
    /// Vault-relative path.
    pub path: String,
    /// File name.
    pub name: String,
    /// Vault-relative parent folder, empty at the top level.
    pub folder: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

/// Text document store confined to a root directory.
///
/// Every operation resolves its path lexically first and fails with
/// `PathEscape` before touching the disk.
#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
}

impl VaultStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, VaultError> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        info!("opened vault store (root={})", root.display());
        Ok(Self { root })
    }

    /// Canonical vault root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve and contain a document path.
    pub fn resolve(&self, path: &str) -> Result<VaultPath, VaultError> {
        let resolved = resolve_lexical(&self.root, path, false)?;
        ensure_within_root(&self.root, &resolved)?;
        Ok(resolved)
    }

    /// Resolve a folder path; the empty string names the root.
    fn resolve_folder(&self, folder: &str) -> Result<VaultPath, VaultError> {
        let resolved = resolve_lexical(&self.root, folder, true)?;
        ensure_within_root(&self.root, &resolved)?;
        Ok(resolved)
    }

    /// Whether a document exists at `path`.
    pub fn exists(&self, path: &str) -> Result<bool, VaultError> {
        Ok(self.resolve(path)?.absolute().is_file())
    }

    /// Read a document as UTF-8 text.
    pub fn read(&self, path: &str) -> Result<String, VaultError> {
        let resolved = self.resolve(path)?;
        read_document(&resolved)
    }

    /// Create or replace a document, creating missing parent folders.
    pub fn write(&self, path: &str, content: &str) -> Result<(), VaultError> {
        let resolved = self.resolve(path)?;
        prepare_target(&resolved)?;
        fs::write(resolved.absolute(), content.as_bytes())?;
        info!(
            "wrote document (path={}, bytes_written={})",
            resolved.relative(),
            content.len()
        );
        Ok(())
    }

    /// Append to a document, creating it if missing.
    pub fn append(&self, path: &str, content: &str) -> Result<(), VaultError> {
        let resolved = self.resolve(path)?;
        prepare_target(&resolved)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(resolved.absolute())?;
        file.write_all(content.as_bytes())?;
        info!(
            "appended to document (path={}, bytes_written={})",
            resolved.relative(),
            content.len()
        );
        Ok(())
    }

    /// List documents below `folder`, recursing and skipping dot-prefixed entries.
    pub fn list(&self, folder: &str) -> Result<Vec<DocumentEntry>, VaultError> {
        let resolved = self.resolve_folder(folder)?;
        if !resolved.absolute().exists() {
            return Err(VaultError::NotFound(resolved.relative().to_string()));
        }
        if !resolved.absolute().is_dir() {
            return Err(VaultError::InvalidPath(format!(
                "{} is not a folder",
                resolved.relative()
            )));
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(resolved.absolute())
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable vault entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let metadata = entry.metadata().map_err(std::io::Error::from)?;
            let relative = relative_string(&self.root, entry.path());
            let (folder, name) = match relative.rsplit_once('/') {
                Some((folder, name)) => (folder.to_string(), name.to_string()),
                None => (String::new(), relative.clone()),
            };
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            entries.push(DocumentEntry {
                path: relative,
                name,
                folder,
                size: metadata.len(),
                modified,
            });
        }
        debug!(
            "listed documents (folder={}, count={})",
            resolved.relative(),
            entries.len()
        );
        Ok(entries)
    }

    /// Move a document, preferring an atomic rename.
    pub fn move_document(&self, from: &str, to: &str) -> Result<(), VaultError> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        if !source.absolute().exists() {
            return Err(VaultError::NotFound(source.relative().to_string()));
        }
        if source.absolute().is_dir() {
            return Err(VaultError::IsDirectory(source.relative().to_string()));
        }
        if target.absolute().exists() {
            return Err(VaultError::AlreadyExists(target.relative().to_string()));
        }
        prepare_target(&target)?;
        move_path(source.absolute(), target.absolute())?;
        info!(
            "moved document (from={}, to={})",
            source.relative(),
            target.relative()
        );
        Ok(())
    }

    /// Permanently remove a document.
    ///
    /// Callers that want reversible deletes go through [`crate::Trash`].
    pub fn delete(&self, path: &str) -> Result<(), VaultError> {
        let resolved = self.resolve(path)?;
        if !resolved.absolute().exists() {
            return Err(VaultError::NotFound(resolved.relative().to_string()));
        }
        if resolved.absolute().is_dir() {
            return Err(VaultError::IsDirectory(resolved.relative().to_string()));
        }
        fs::remove_file(resolved.absolute())?;
        info!("deleted document (path={})", resolved.relative());
        Ok(())
    }
}

/// Read a resolved document, mapping missing files and folders.
pub(crate) fn read_document(path: &VaultPath) -> Result<String, VaultError> {
    if path.absolute().is_dir() {
        return Err(VaultError::IsDirectory(path.relative().to_string()));
    }
    match fs::read_to_string(path.absolute()) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(VaultError::NotFound(path.relative().to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Rename, falling back to copy-then-remove when the medium refuses renames.
pub(crate) fn move_path(from: &Path, to: &Path) -> Result<(), VaultError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(err.into()),
        Err(err) => {
            debug!(
                "rename failed, copying instead (from={}, to={}): {}",
                from.display(),
                to.display(),
                err
            );
            fs::copy(from, to)?;
            fs::remove_file(from)?;
            Ok(())
        }
    }
}

fn prepare_target(path: &VaultPath) -> Result<(), VaultError> {
    if path.absolute().is_dir() {
        return Err(VaultError::IsDirectory(path.relative().to_string()));
    }
    if let Some(parent) = path.absolute().parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Forward-slash path of `path` relative to `root`.
pub(crate) fn relative_string(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::VaultStore;
    use crate::VaultError;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn write_creates_parents_and_read_returns_content() {
        let temp = tempdir().expect("tempdir");
        let store = VaultStore::open(temp.path()).expect("store");
        store.write("notes/ideas/a.md", "hello").expect("write");
        assert_eq!(store.read("notes/ideas/a.md").expect("read"), "hello");
        assert!(store.exists("notes/ideas/a.md").expect("exists"));
    }

    #[test]
    fn append_creates_and_extends() {
        let temp = tempdir().expect("tempdir");
        let store = VaultStore::open(temp.path()).expect("store");
        store.append("log.md", "one").expect("append");
        store.append("log.md", "+two").expect("append");
        assert_eq!(store.read("log.md").expect("read"), "one+two");
    }

    #[test]
    fn list_recurses_and_skips_dot_entries() {
        let temp = tempdir().expect("tempdir");
        let store = VaultStore::open(temp.path()).expect("store");
        store.write("a.md", "a").expect("write");
        store.write("notes/b.md", "bb").expect("write");
        std::fs::create_dir_all(temp.path().join(".obsidian")).expect("dir");
        std::fs::write(temp.path().join(".obsidian/config"), "{}").expect("write");
        std::fs::write(temp.path().join("notes/.draft.md"), "x").expect("write");

        let entries = store.list("").expect("list");
        let paths = entries.iter().map(|e| e.path.as_str()).collect::<Vec<_>>();
        assert_eq!(paths, vec!["a.md", "notes/b.md"]);
        assert_eq!(entries[1].folder, "notes");
        assert_eq!(entries[1].name, "b.md");
        assert_eq!(entries[1].size, 2);

        let nested = store.list("notes").expect("list");
        assert_eq!(nested.len(), 1);
    }

    #[test]
    fn list_missing_folder_is_not_found() {
        let temp = tempdir().expect("tempdir");
        let store = VaultStore::open(temp.path()).expect("store");
        assert!(matches!(store.list("nope"), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn move_renames_and_refuses_to_clobber() {
        let temp = tempdir().expect("tempdir");
        let store = VaultStore::open(temp.path()).expect("store");
        store.write("inbox/a.md", "a").expect("write");
        store.write("b.md", "b").expect("write");

        store
            .move_document("inbox/a.md", "archive/2026/a.md")
            .expect("move");
        assert!(!store.exists("inbox/a.md").expect("exists"));
        assert_eq!(store.read("archive/2026/a.md").expect("read"), "a");

        let err = store
            .move_document("archive/2026/a.md", "b.md")
            .expect_err("clobber");
        assert!(matches!(err, VaultError::AlreadyExists(_)));
    }

    #[test]
    fn delete_removes_file() {
        let temp = tempdir().expect("tempdir");
        let store = VaultStore::open(temp.path()).expect("store");
        store.write("a.md", "a").expect("write");
        store.delete("a.md").expect("delete");
        assert!(matches!(store.read("a.md"), Err(VaultError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_root_is_an_escape() {
        let temp = tempdir().expect("tempdir");
        let outside = tempdir().expect("outside");
        std::fs::write(outside.path().join("secret.md"), "s").expect("write");
        let store = VaultStore::open(temp.path()).expect("store");
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link")).expect("symlink");

        let err = store.read("link/secret.md").expect_err("escape");
        assert!(matches!(err, VaultError::PathEscape(_)));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_out_of_root_is_an_escape() {
        let temp = tempdir().expect("tempdir");
        let outside = tempdir().expect("outside");
        let store = VaultStore::open(temp.path()).expect("store");
        let target = outside.path().join("pwned.md");
        std::os::unix::fs::symlink(&target, temp.path().join("note.md")).expect("symlink");

        let err = store.write("note.md", "escaped").expect_err("escape");
        assert!(matches!(err, VaultError::PathEscape(_)));
        let err = store.append("note.md", "escaped").expect_err("escape");
        assert!(matches!(err, VaultError::PathEscape(_)));
        assert!(!target.exists());
    }
}
