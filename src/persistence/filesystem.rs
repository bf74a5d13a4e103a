//! Filesystem Backing Store
//!
//! Persists each key as two files under a root directory:
//! `<key>.meta` holds the JSON metadata and `<key>.data` the raw payload.
//! A `/` in a key becomes a sub-directory and `:` is encoded in file names.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::BackingStore;
use crate::cache::Entry;
use crate::error::{PersistenceError, PersistenceResult};

const META_EXTENSION: &str = ".meta";
const DATA_EXTENSION: &str = ".data";
const COLON_MARKER: &str = "_COLON_";

/// Backing store writing one metadata file and one data file per key.
#[derive(Debug, Clone)]
pub struct FsBackingStore {
    root: PathBuf,
}

impl FsBackingStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, key: &str, extension: &str) -> PersistenceResult<PathBuf> {
        let mut path = self.root.clone();
        let mut segments = key.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(PersistenceError::InvalidPath(key.to_string()));
            }
            let encoded = segment.replace(':', COLON_MARKER);
            if segments.peek().is_some() {
                path.push(encoded);
            } else {
                path.push(format!("{encoded}{extension}"));
            }
        }
        Ok(path)
    }
}

async fn remove_if_present(path: &Path) -> PersistenceResult<()> {
    match fs::remove_file(path).await {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

#[async_trait]
impl BackingStore for FsBackingStore {
    async fn write(&self, key: &str, entry: &Entry) -> PersistenceResult<()> {
        let meta_path = self.file_path(key, META_EXTENSION)?;
        if let Some(parent) = meta_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&meta_path, serde_json::to_vec(entry)?).await?;

        if let Some(payload) = &entry.payload {
            fs::write(self.file_path(key, DATA_EXTENSION)?, payload).await?;
        }
        Ok(())
    }

    async fn read(&self, key: &str, with_payload: bool) -> PersistenceResult<Entry> {
        let meta = fs::read(self.file_path(key, META_EXTENSION)?).await?;
        let mut entry: Entry = serde_json::from_slice(&meta)?;

        if with_payload {
            let payload = fs::read(self.file_path(key, DATA_EXTENSION)?).await?;
            entry.set_payload(payload);
        }
        Ok(entry)
    }

    async fn delete(&self, key: &str) -> PersistenceResult<()> {
        remove_if_present(&self.file_path(key, META_EXTENSION)?).await?;
        remove_if_present(&self.file_path(key, DATA_EXTENSION)?).await
    }

    async fn keys(&self) -> PersistenceResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(item) = entries.next_entry().await? {
                let name = item.file_name().to_string_lossy().into_owned();
                if item.file_type().await?.is_dir() {
                    pending.push((item.path(), format!("{prefix}{name}/")));
                } else if let Some(stem) = name.strip_suffix(META_EXTENSION) {
                    if !stem.is_empty() {
                        keys.push(format!("{prefix}{stem}").replace(COLON_MARKER, ":"));
                    }
                }
            }
        }
        Ok(keys)
    }

    async fn close(&self) {
        debug!("Filesystem backing store at {} closed", self.root.display());
    }
}
