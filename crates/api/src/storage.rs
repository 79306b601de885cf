// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! On-disk storage for ticket images.
//!
//! Files live under `<root>/tickets/<ticket_id>/` with a random name and the
//! validated extension. Only the path relative to the root is recorded.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use repairdesk_domain::sha256_hex;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading, writing or removing stored files.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The ticket directory could not be created.
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The recorded file is no longer on disk.
    #[error("Stored file {0} is missing")]
    Missing(String),

    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file could not be removed.
    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored path tried to leave the storage root.
    #[error("Path '{0}' is outside the storage root")]
    OutsideRoot(String),
}

/// A file written by [`ReceiptStore::store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Path relative to the storage root, using `/` separators.
    pub relative_path: String,
    /// SHA-256 hex of the contents.
    pub checksum_sha256: String,
    /// Size of the contents in bytes.
    pub size_bytes: u64,
}

/// Writes ticket images beneath a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptStore {
    root: PathBuf,
}

impl ReceiptStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `contents` for `ticket_id` under a fresh random name.
    ///
    /// # Arguments
    ///
    /// * `ticket_id` - The owning ticket
    /// * `extension` - The validated, lowercase file extension
    /// * `contents` - The file bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be written. A name collision is reported as a write failure.
    pub fn store(
        &self,
        ticket_id: i64,
        extension: &str,
        contents: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let directory: PathBuf = self.root.join("tickets").join(ticket_id.to_string());
        fs::create_dir_all(&directory).map_err(|source| StorageError::CreateDirectory {
            path: directory.clone(),
            source,
        })?;

        let file_name: String = format!("{}.{extension}", random_name());
        let path: PathBuf = directory.join(&file_name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;
        file.write_all(contents)
            .and_then(|()| file.sync_all())
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        let stored = StoredFile {
            relative_path: format!("tickets/{ticket_id}/{file_name}"),
            checksum_sha256: sha256_hex(contents),
            size_bytes: contents.len() as u64,
        };
        debug!(path = %stored.relative_path, size = stored.size_bytes, "Stored ticket file");
        Ok(stored)
    }

    /// Resolves a stored relative path to an absolute location.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::OutsideRoot` if the path is absolute or climbs
    /// out of the root.
    pub fn resolve(&self, relative_path: &str) -> Result<PathBuf, StorageError> {
        let relative: &Path = Path::new(relative_path);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::OutsideRoot(relative_path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Reads a stored file back.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Missing` if the file is gone, `OutsideRoot` for
    /// an invalid path, or `Read` for any other I/O failure.
    pub fn read(&self, relative_path: &str) -> Result<Vec<u8>, StorageError> {
        let path: PathBuf = self.resolve(relative_path)?;
        fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StorageError::Missing(relative_path.to_string())
            } else {
                StorageError::Read { path, source }
            }
        })
    }

    /// Deletes a stored file. Used to undo a write whose database row was rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the file cannot be removed.
    pub fn remove(&self, relative_path: &str) -> Result<(), StorageError> {
        let path: PathBuf = self.resolve(relative_path)?;
        fs::remove_file(&path).map_err(|source| StorageError::Remove { path, source })
    }
}

/// 128 random bits as lowercase hex.
fn random_name() -> String {
    format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_writes_under_ticket_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ReceiptStore::new(dir.path());

        let stored = store.store(42, "png", b"receipt bytes").unwrap();

        assert!(stored.relative_path.starts_with("tickets/42/"));
        assert!(
            std::path::Path::new(&stored.relative_path)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        );
        assert_eq!(stored.size_bytes, 13);
        assert_eq!(stored.checksum_sha256, sha256_hex(b"receipt bytes"));

        let on_disk = fs::read(store.resolve(&stored.relative_path).unwrap()).unwrap();
        assert_eq!(on_disk, b"receipt bytes");
    }

    #[test]
    fn test_same_contents_get_distinct_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ReceiptStore::new(dir.path());

        let first = store.store(1, "jpg", b"same").unwrap();
        let second = store.store(1, "jpg", b"same").unwrap();

        assert_ne!(first.relative_path, second.relative_path);
        assert_eq!(first.checksum_sha256, second.checksum_sha256);
    }

    #[test]
    fn test_read_returns_stored_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ReceiptStore::new(dir.path());
        let stored = store.store(3, "jpg", b"jpeg bytes").unwrap();

        assert_eq!(store.read(&stored.relative_path).unwrap(), b"jpeg bytes");

        store.remove(&stored.relative_path).unwrap();
        assert!(matches!(
            store.read(&stored.relative_path),
            Err(StorageError::Missing(_))
        ));
        assert!(matches!(
            store.read("../secret.jpg"),
            Err(StorageError::OutsideRoot(_))
        ));
    }

    #[test]
    fn test_remove_deletes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ReceiptStore::new(dir.path());
        let stored = store.store(7, "webp", b"x").unwrap();

        store.remove(&stored.relative_path).unwrap();

        assert!(!store.resolve(&stored.relative_path).unwrap().exists());
    }

    #[test]
    fn test_resolve_rejects_escaping_paths() {
        let store = ReceiptStore::new("/srv/uploads");

        assert!(matches!(
            store.resolve("../etc/passwd"),
            Err(StorageError::OutsideRoot(_))
        ));
        assert!(matches!(
            store.resolve("/etc/passwd"),
            Err(StorageError::OutsideRoot(_))
        ));
        assert_eq!(
            store.resolve("tickets/1/a.png").unwrap(),
            PathBuf::from("/srv/uploads/tickets/1/a.png")
        );
    }
}
