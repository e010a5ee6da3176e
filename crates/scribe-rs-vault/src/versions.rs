//! Pre-image snapshots for documents and restore support.

use crate::error::VaultError;
use crate::path::{VERSIONS_DIR, VaultPath};
use crate::store::{VaultStore, read_document};
use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::{Mutex, const_mutex};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

/// File extension used for snapshot files.
const SNAPSHOT_EXT: &str = "snap";
/// Timestamp layout shared by version ids and trash entries.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

/// Last issued (millisecond, sequence) pair; keeps ids strictly increasing
/// within the process even when the clock stalls or steps back.
static LAST_VERSION: Mutex<(i64, u32)> = const_mutex((i64::MIN, 0));

/// How a write combines with existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Replace the document; snapshots the previous content first.
    #[default]
    Overwrite,
    /// Add to the end of the document; never snapshots.
    Append,
}

/// Metadata for a stored snapshot.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VersionEntry {
    /// Sortable version id.
    pub id: String,
    /// Document the snapshot belongs to.
    pub path: String,
    /// Snapshot size in bytes.
    pub size: u64,
}

/// Outcome of a versioned write.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WriteReceipt {
    pub path: String,
    pub mode: WriteMode,
    /// Id of the snapshot taken before the write, if any.
    pub snapshot: Option<String>,
    pub bytes_written: usize,
}

/// Outcome of a restore.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RestoreReceipt {
    pub path: String,
    /// Version that was put back.
    pub restored: String,
    /// Snapshot of the content that was live before the restore.
    pub backup: Option<String>,
}

/// Wraps the store to snapshot documents before every overwrite.
#[derive(Debug, Clone)]
pub struct VersionKeeper {
    store: VaultStore,
}

impl VersionKeeper {
    pub fn new(store: VaultStore) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    /// Write a document, snapshotting its current content first on overwrite.
    pub fn write(
        &self,
        path: &str,
        content: &str,
        mode: WriteMode,
    ) -> Result<WriteReceipt, VaultError> {
        let resolved = self.store.resolve(path)?;
        let snapshot = match mode {
            WriteMode::Overwrite => {
                let snapshot = self.snapshot(&resolved)?;
                self.store.write(resolved.relative(), content)?;
                snapshot
            }
            WriteMode::Append => {
                self.store.append(resolved.relative(), content)?;
                None
            }
        };
        Ok(WriteReceipt {
            path: resolved.relative().to_string(),
            mode,
            snapshot,
            bytes_written: content.len(),
        })
    }

    /// All snapshots for a document, newest first.
    pub fn list_versions(&self, path: &str) -> Result<Vec<VersionEntry>, VaultError> {
        let resolved = self.store.resolve(path)?;
        let dir = self.versions_dir(&resolved);
        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut versions = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let file_path = entry.path();
            if file_path.extension().and_then(|ext| ext.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            let Some(id) = file_path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            versions.push(VersionEntry {
                id: id.to_string(),
                path: resolved.relative().to_string(),
                size: entry.metadata()?.len(),
            });
        }
        versions.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(versions)
    }

    /// Content of a specific snapshot, matched as in [`Self::restore`].
    pub fn read_version(&self, path: &str, version: &str) -> Result<String, VaultError> {
        let resolved = self.store.resolve(path)?;
        let entry = self.find_version(&resolved, version)?;
        Ok(fs::read_to_string(self.snapshot_path(&resolved, &entry.id))?)
    }

    /// Put a snapshot back as the live document.
    ///
    /// `version` matches exactly, or else by substring in either direction
    /// (newest match wins). The live content is snapshotted first, so a
    /// restore can itself be undone.
    pub fn restore(&self, path: &str, version: &str) -> Result<RestoreReceipt, VaultError> {
        let resolved = self.store.resolve(path)?;
        let entry = self.find_version(&resolved, version)?;
        let content = fs::read_to_string(self.snapshot_path(&resolved, &entry.id))?;
        let receipt = self.write(resolved.relative(), &content, WriteMode::Overwrite)?;
        info!(
            "restored document (path={}, version={}, backup={:?})",
            resolved.relative(),
            entry.id,
            receipt.snapshot
        );
        Ok(RestoreReceipt {
            path: resolved.relative().to_string(),
            restored: entry.id,
            backup: receipt.snapshot,
        })
    }

    fn find_version(&self, path: &VaultPath, version: &str) -> Result<VersionEntry, VaultError> {
        let not_found = || VaultError::VersionNotFound {
            path: path.relative().to_string(),
            version: version.to_string(),
        };
        let version = version.trim();
        if version.is_empty() {
            return Err(not_found());
        }
        let versions = self.list_versions(path.relative())?;
        if let Some(exact) = versions.iter().find(|entry| entry.id == version) {
            return Ok(exact.clone());
        }
        versions
            .into_iter()
            .find(|entry| entry.id.contains(version) || version.contains(entry.id.as_str()))
            .ok_or_else(not_found)
    }

    /// Copy the live content into a new snapshot; `None` when nothing is live.
    fn snapshot(&self, path: &VaultPath) -> Result<Option<String>, VaultError> {
        let current = match read_document(path) {
            Ok(content) => content,
            Err(VaultError::NotFound(_)) => {
                debug!(
                    "no live content to snapshot (path={})",
                    path.relative()
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let dir = self.versions_dir(path);
        fs::create_dir_all(&dir)?;
        loop {
            let id = next_version_id(Utc::now());
            let snapshot_path = dir.join(format!("{id}.{SNAPSHOT_EXT}"));
            // create_new guards against another process issuing the same id.
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&snapshot_path)
            {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            };
            file.write_all(current.as_bytes())?;
            debug!(
                "captured snapshot (path={}, version={}, bytes={})",
                path.relative(),
                id,
                current.len()
            );
            return Ok(Some(id));
        }
    }

    fn versions_dir(&self, path: &VaultPath) -> PathBuf {
        let mut dir = self.store.root().join(VERSIONS_DIR);
        for part in path.relative().split('/') {
            dir.push(part);
        }
        dir
    }

    fn snapshot_path(&self, path: &VaultPath, id: &str) -> PathBuf {
        self.versions_dir(path).join(format!("{id}.{SNAPSHOT_EXT}"))
    }
}

/// Issue the next sortable version id for `now`.
fn next_version_id(now: DateTime<Utc>) -> String {
    let mut last = LAST_VERSION.lock();
    let millis = now.timestamp_millis();
    let (millis, sequence) = if millis > last.0 {
        (millis, 0)
    } else {
        (last.0, last.1 + 1)
    };
    *last = (millis, sequence);
    let stamp = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(now);
    format!("{}-{:04}", stamp.format(TIMESTAMP_FORMAT), sequence)
}
