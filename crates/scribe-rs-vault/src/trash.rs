//! Reversible delete: documents move into a quarantine folder.

use crate::error::VaultError;
use crate::path::{TRASH_DIR, VaultPath, is_protected};
use crate::store::{VaultStore, move_path, relative_string};
use crate::versions::TIMESTAMP_FORMAT;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Separator between the deletion stamp and the original file name.
const STAMP_SEPARATOR: &str = "__";

/// A soft-deleted document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TrashEntry {
    /// Where the document lived before deletion.
    pub original_path: String,
    /// When it was deleted, if the stamp parses.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Vault-relative location inside the trash.
    pub trash_path: String,
}

/// Wraps the store to move deleted documents into `.trash/`.
#[derive(Debug, Clone)]
pub struct Trash {
    store: VaultStore,
    protected_prefixes: Vec<String>,
}

impl Trash {
    pub fn new(store: VaultStore, protected_prefixes: Vec<String>) -> Self {
        Self {
            store,
            protected_prefixes,
        }
    }

    /// Prefixes that can never be soft-deleted.
    pub fn protected_prefixes(&self) -> &[String] {
        &self.protected_prefixes
    }

    /// Resolve `path`, refusing anything under a protected prefix.
    fn resolve_unprotected(&self, path: &str, action: &str) -> Result<VaultPath, VaultError> {
        let resolved = self.store.resolve(path)?;
        if is_protected(resolved.relative(), &self.protected_prefixes) {
            warn!(
                "refused {action} of protected path (path={})",
                resolved.relative()
            );
            return Err(VaultError::ProtectedPath(resolved.relative().to_string()));
        }
        Ok(resolved)
    }

    /// Move a document, refusing to take one out of a protected prefix.
    ///
    /// A move empties the source path, so it gets the same guard as a delete.
    pub fn move_document(&self, from: &str, to: &str) -> Result<(), VaultError> {
        let source = self.resolve_unprotected(from, "move")?;
        self.store.move_document(source.relative(), to)
    }

    /// Move a document into the trash. Fails closed for protected paths.
    ///
    /// Top-level documents land directly in `.trash/`, nested ones under their folder.
    pub fn soft_delete(&self, path: &str) -> Result<TrashEntry, VaultError> {
        let resolved = self.resolve_unprotected(path, "delete")?;
        if !resolved.absolute().exists() {
            return Err(VaultError::NotFound(resolved.relative().to_string()));
        }
        if resolved.absolute().is_dir() {
            return Err(VaultError::IsDirectory(resolved.relative().to_string()));
        }

        let deleted_at = Utc::now();
        let mut dir = self.store.root().join(TRASH_DIR);
        for part in resolved.folder().split('/').filter(|part| !part.is_empty()) {
            dir.push(part);
        }
        fs::create_dir_all(&dir)?;
        let target = unique_target(&dir, deleted_at, resolved.file_name());
        move_path(resolved.absolute(), &target)?;

        let entry = TrashEntry {
            original_path: resolved.relative().to_string(),
            deleted_at: Some(deleted_at),
            trash_path: relative_string(self.store.root(), &target),
        };
        info!(
            "moved document to trash (path={}, trash_path={})",
            entry.original_path, entry.trash_path
        );
        Ok(entry)
    }

    /// Every trashed document, oldest deletion first.
    pub fn list_trash(&self) -> Result<Vec<TrashEntry>, VaultError> {
        let trash_root = self.store.root().join(TRASH_DIR);
        if !trash_root.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in WalkDir::new(&trash_root).follow_links(false) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let within_trash = relative_string(&trash_root, entry.path());
            let (folder, file) = within_trash
                .rsplit_once('/')
                .unwrap_or(("", within_trash.as_str()));
            let Some((stamp, name)) = file.split_once(STAMP_SEPARATOR) else {
                continue;
            };
            let original_path = if folder.is_empty() {
                name.to_string()
            } else {
                format!("{folder}/{name}")
            };
            entries.push(TrashEntry {
                original_path,
                deleted_at: parse_stamp(stamp),
                trash_path: relative_string(self.store.root(), entry.path()),
            });
        }
        entries.sort_by(|a, b| a.trash_path.cmp(&b.trash_path));
        entries.sort_by_key(|entry| entry.deleted_at);
        Ok(entries)
    }
}

/// Pick a trash file name that does not clobber an earlier deletion.
fn unique_target(dir: &std::path::Path, deleted_at: DateTime<Utc>, name: &str) -> PathBuf {
    let stamp = deleted_at.format(TIMESTAMP_FORMAT).to_string();
    let mut candidate = dir.join(format!("{stamp}{STAMP_SEPARATOR}{name}"));
    let mut attempt = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{stamp}-{attempt}{STAMP_SEPARATOR}{name}"));
        attempt += 1;
    }
    candidate
}

fn parse_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    let stamp = match stamp.rsplit_once('-') {
        Some((base, suffix)) if suffix.chars().all(|c| c.is_ascii_digit()) => base,
        _ => stamp,
    };
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn trash(root: &std::path::Path) -> Trash {
        let store = VaultStore::open(root).expect("store");
        Trash::new(store, vec!["journal/".to_string()])
    }

    #[test]
    fn soft_delete_moves_into_quarantine() {
        let temp = tempdir().expect("tempdir");
        let trash = trash(temp.path());
        std::fs::create_dir_all(temp.path().join("notes")).expect("dir");
        std::fs::write(temp.path().join("notes/old.md"), "old").expect("write");

        let entry = trash.soft_delete("notes/old.md").expect("delete");
        assert_eq!(entry.original_path, "notes/old.md");
        assert!(entry.trash_path.starts_with(".trash/notes/"));
        assert!(entry.trash_path.ends_with("__old.md"));
        assert!(!temp.path().join("notes/old.md").exists());
        assert_eq!(
            std::fs::read_to_string(temp.path().join(&entry.trash_path)).expect("read"),
            "old"
        );
    }

    #[test]
    fn protected_paths_fail_closed() {
        let temp = tempdir().expect("tempdir");
        let trash = trash(temp.path());
        std::fs::create_dir_all(temp.path().join("journal")).expect("dir");
        std::fs::write(temp.path().join("journal/2026-10-16.md"), "entry").expect("write");

        for path in ["journal/2026-10-16.md", "./journal//2026-10-16.md"] {
            let err = trash.soft_delete(path).expect_err("protected");
            assert!(matches!(err, VaultError::ProtectedPath(_)));
        }
        assert!(temp.path().join("journal/2026-10-16.md").exists());
    }

    #[test]
    fn list_trash_reconstructs_original_paths() {
        let temp = tempdir().expect("tempdir");
        let trash = trash(temp.path());
        std::fs::write(temp.path().join("top.md"), "t").expect("write");
        std::fs::create_dir_all(temp.path().join("a/b")).expect("dir");
        std::fs::write(temp.path().join("a/b/deep.md"), "d").expect("write");
        trash.soft_delete("top.md").expect("delete");
        trash.soft_delete("a/b/deep.md").expect("delete");

        std::fs::write(temp.path().join("top.md"), "t2").expect("write");
        trash.soft_delete("top.md").expect("delete again");

        let mut originals = trash
            .list_trash()
            .expect("list")
            .into_iter()
            .map(|entry| {
                assert!(entry.deleted_at.is_some());
                entry.original_path
            })
            .collect::<Vec<_>>();
        originals.sort();
        assert_eq!(originals, vec!["a/b/deep.md", "top.md", "top.md"]);
    }

    #[test]
    fn top_level_and_lookalike_folders_stay_distinct() {
        let temp = tempdir().expect("tempdir");
        let trash = trash(temp.path());
        std::fs::write(temp.path().join("a.md"), "top").expect("write");
        std::fs::create_dir_all(temp.path().join("_root")).expect("dir");
        std::fs::write(temp.path().join("_root/a.md"), "nested").expect("write");

        let top = trash.soft_delete("a.md").expect("delete");
        assert!(top.trash_path.starts_with(".trash/"));
        assert_eq!(top.trash_path.matches('/').count(), 1);
        trash.soft_delete("_root/a.md").expect("delete");

        let mut originals = trash
            .list_trash()
            .expect("list")
            .into_iter()
            .map(|entry| entry.original_path)
            .collect::<Vec<_>>();
        originals.sort();
        assert_eq!(originals, vec!["_root/a.md", "a.md"]);
    }

    #[test]
    fn protected_documents_cannot_be_moved_out() {
        let temp = tempdir().expect("tempdir");
        let trash = trash(temp.path());
        std::fs::create_dir_all(temp.path().join("journal")).expect("dir");
        std::fs::write(temp.path().join("journal/day.md"), "entry").expect("write");

        let err = trash
            .move_document("journal/day.md", "notes/day.md")
            .expect_err("protected");
        assert!(matches!(err, VaultError::ProtectedPath(_)));
        assert!(matches!(
            trash.soft_delete("notes/day.md"),
            Err(VaultError::NotFound(_))
        ));
        assert!(temp.path().join("journal/day.md").exists());

        std::fs::write(temp.path().join("inbox.md"), "i").expect("write");
        trash
            .move_document("inbox.md", "journal/inbox.md")
            .expect("into protected");
        assert!(temp.path().join("journal/inbox.md").exists());
    }

    #[test]
    fn parse_stamp_handles_collision_suffix() {
        let now = Utc::now();
        let stamp = now.format(TIMESTAMP_FORMAT).to_string();
        let parsed = parse_stamp(&format!("{stamp}-2")).expect("parsed");
        assert_eq!(parsed.timestamp_millis(), now.timestamp_millis());
    }
}
