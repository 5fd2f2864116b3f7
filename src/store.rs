//! Config store — persistence layer for the backend configuration.
//!
//! The [`ConfigStore`] trait is a plain key/value interface. The backend
//! only ever touches a single key, so implementations need atomic
//! single-key reads and writes and nothing more; concurrent writers race
//! with last-writer-wins semantics.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{Error, Result};

/// Trait abstracting the configuration storage backend.
///
/// Implementations must be `Send + Sync` because a single store is shared
/// by every in-flight request.
#[async_trait::async_trait]
pub trait ConfigStore: Send + Sync + 'static {
    /// Fetch the raw bytes stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Unconditionally overwrite the value stored under `key`.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove `key`. Returns `true` if an entry existed.
    ///
    /// The backend never deletes its configuration; this is the storage
    /// layer's own removal path (operator cleanup, tests).
    async fn delete(&self, key: &str) -> Result<bool>;
}

/// In-memory store backed by a `DashMap`.
#[derive(Default)]
pub struct InMemoryConfigStore {
    entries: DashMap<String, Vec<u8>>,
}

impl InMemoryConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}

/// File-backed store: one `<key>.json` file per entry in a directory.
///
/// Entries hold upstream credentials in clear, so files are created with
/// owner-only permissions on unix.
pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::Storage(format!(
                "Failed to create storage directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self { dir })
    }

    /// Directory this store writes to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if !valid {
            return Err(Error::Storage(format!("Invalid storage key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Write through a uniquely named temp file in the store directory, then
    /// rename it over `path`. Concurrent writers never share a temp file, so
    /// the entry always holds one complete value.
    fn write_entry(dir: &Path, path: &Path, value: &[u8]) -> io::Result<()> {
        let mut tmp = NamedTempFile::new_in(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConfigStore for FileConfigStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.entry_path(key)?;
        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || Self::write_entry(&dir, &target, &value))
            .await
            .map_err(|e| Error::Storage(format!("Storage write task failed: {e}")))?
            .map_err(|e| Error::Storage(format!("Failed to write {}: {e}", path.display())))?;

        debug!(path = %path.display(), "Stored entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Storage(format!(
                "Failed to delete {}: {e}",
                path.display()
            ))),
        }
    }
}
