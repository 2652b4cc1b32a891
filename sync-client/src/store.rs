//! Local vault storage.
//!
//! The engine reads and writes the local file tree through the
//! [`VaultStore`] trait: [`FsStore`] for a real vault directory,
//! [`MemStore`] for tests. Paths are vault-relative with `/`
//! separators, matching the decrypted paths on the wire.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use thiserror::Error;

use sync_types::LocalEntry;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A vault path resolved outside the vault root.
    #[error("path escapes the vault root: {0}")]
    PathEscape(String),
}

/// The local side of a vault.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Enumerate the current local tree.
    async fn scan(&self) -> Result<Vec<LocalEntry>, StoreError>;

    /// Read a file's content.
    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Write a file, creating parent folders as needed.
    async fn write(&self, path: &str, content: &[u8]) -> Result<(), StoreError>;

    /// Remove a file or folder. Removing something already gone is not
    /// an error.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Create a folder (and any missing parents).
    async fn create_folder(&self, path: &str) -> Result<(), StoreError>;
}

/// A vault rooted at a local directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a vault-relative path, refusing anything that could
    /// step outside the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(path);
        let escapes = rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes || path.is_empty() {
            return Err(StoreError::PathEscape(path.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl VaultStore for FsStore {
    async fn scan(&self) -> Result<Vec<LocalEntry>, StoreError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scan_tree(&root))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::new(ErrorKind::Other, e)))?
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        Ok(tokio::fs::read(self.resolve(path)?).await?)
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(full, content).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        let result = match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&full).await,
            Ok(_) => tokio::fs::remove_file(&full).await,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        match result {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => Ok(other?),
        }
    }

    async fn create_folder(&self, path: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(self.resolve(path)?).await?;
        Ok(())
    }
}

fn scan_tree(root: &Path) -> Result<Vec<LocalEntry>, StoreError> {
    let mut entries = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for item in std::fs::read_dir(&dir)? {
            let item = item?;
            let name = item.file_name();
            // Hidden entries (editor state, VCS metadata) stay local.
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            let full = item.path();
            let Ok(rel) = full.strip_prefix(root) else {
                continue;
            };
            let Some(vault_path) = vault_path(rel) else {
                continue;
            };
            let meta = item.metadata()?;
            let mtime = epoch_ms(meta.modified()?);
            let ctime = meta.created().map(epoch_ms).unwrap_or(mtime);
            if meta.is_dir() {
                stack.push(full);
                entries.push(LocalEntry::new_folder(vault_path, ctime));
            } else if meta.is_file() {
                entries.push(LocalEntry::new_file(vault_path, ctime, mtime));
            }
        }
    }
    Ok(entries)
}

/// Relative filesystem path to vault path (`/` separators). Non-UTF-8
/// names are skipped.
fn vault_path(rel: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        parts.push(component.as_os_str().to_str()?);
    }
    Some(parts.join("/"))
}

fn epoch_ms(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// In-memory store for engine tests.
#[derive(Default)]
pub struct MemStore {
    files: Mutex<BTreeMap<String, (Vec<u8>, i64, i64)>>,
    folders: Mutex<BTreeMap<String, i64>>,
}

impl MemStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a file with explicit timestamps.
    pub fn stage_file(&self, path: &str, content: &[u8], ctime: i64, mtime: i64) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), (content.to_vec(), ctime, mtime));
    }

    /// Stage a folder with an explicit creation time.
    pub fn stage_folder(&self, path: &str, ctime: i64) {
        self.folders.lock().unwrap().insert(path.to_string(), ctime);
    }

    /// Content of a stored file, if present.
    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).map(|(c, _, _)| c.clone())
    }

    /// Whether a folder exists.
    pub fn has_folder(&self, path: &str) -> bool {
        self.folders.lock().unwrap().contains_key(path)
    }
}

#[async_trait]
impl VaultStore for MemStore {
    async fn scan(&self) -> Result<Vec<LocalEntry>, StoreError> {
        let files = self.files.lock().unwrap();
        let folders = self.folders.lock().unwrap();
        let mut entries: Vec<LocalEntry> = folders
            .iter()
            .map(|(path, ctime)| LocalEntry::new_folder(path.as_str(), *ctime))
            .collect();
        entries.extend(
            files
                .iter()
                .map(|(path, (_, ctime, mtime))| LocalEntry::new_file(path.as_str(), *ctime, *mtime)),
        );
        Ok(entries)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.content(path)
            .ok_or_else(|| StoreError::Io(std::io::Error::new(ErrorKind::NotFound, path)))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<(), StoreError> {
        self.stage_file(path, content, 0, 0);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.files.lock().unwrap().remove(path);
        self.folders.lock().unwrap().remove(path);
        Ok(())
    }

    async fn create_folder(&self, path: &str) -> Result<(), StoreError> {
        self.stage_folder(path, 0);
        Ok(())
    }
}
