//! In-memory backing store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::BackingStore;
use crate::cache::Entry;
use crate::error::{PersistenceError, PersistenceResult};

/// Keeps persisted entries in a process-local map.
///
/// Failures can be injected with [`fail_writes`](Self::fail_writes) and
/// [`fail_reads`](Self::fail_reads).
#[derive(Debug, Default)]
pub struct MemoryBackingStore {
    entries: RwLock<HashMap<String, Entry>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    writes: AtomicU64,
    reads: AtomicU64,
    deletes: AtomicU64,
    closed: AtomicBool,
}

impl MemoryBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes and deletes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Snapshot of a persisted entry, payload included.
    pub async fn snapshot(&self, key: &str) -> Option<Entry> {
        self.entries.read().await.get(key).cloned()
    }

    fn check_writes(&self, op: &str, key: &str) -> PersistenceResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Other(anyhow!("injected {op} failure for {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl BackingStore for MemoryBackingStore {
    async fn write(&self, key: &str, entry: &Entry) -> PersistenceResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_writes("write", key)?;

        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            // Metadata-only writes keep the previously persisted payload
            Some(existing) if !entry.is_loaded() => {
                let payload = existing.payload.take();
                *existing = entry.clone();
                existing.payload = payload;
            }
            _ => {
                entries.insert(key.to_string(), entry.clone());
            }
        }
        Ok(())
    }

    async fn read(&self, key: &str, with_payload: bool) -> PersistenceResult<Entry> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistenceError::Other(anyhow!("injected read failure for {key}")));
        }

        let entries = self.entries.read().await;
        let mut entry = entries
            .get(key)
            .cloned()
            .ok_or_else(|| PersistenceError::Other(anyhow!("no persisted entry for {key}")))?;
        if !with_payload {
            entry.unload();
        }
        Ok(entry)
    }

    async fn delete(&self, key: &str) -> PersistenceResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_writes("delete", key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> PersistenceResult<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let backend = MemoryBackingStore::new();
        let entry = Entry::new(b"value".to_vec(), Utc::now());

        backend.write("k", &entry).await.unwrap();

        let full = backend.read("k", true).await.unwrap();
        assert_eq!(full.payload.as_deref(), Some(&b"value"[..]));

        let meta = backend.read("k", false).await.unwrap();
        assert!(!meta.is_loaded());
        assert_eq!(meta.timestamp, entry.timestamp);
    }

    #[tokio::test]
    async fn test_metadata_write_keeps_payload() {
        let backend = MemoryBackingStore::new();
        let mut entry = Entry::new(b"value".to_vec(), Utc::now());
        backend.write("k", &entry).await.unwrap();

        entry.unload();
        entry.ttl = 99;
        backend.write("k", &entry).await.unwrap();

        let full = backend.read("k", true).await.unwrap();
        assert_eq!(full.ttl, 99);
        assert_eq!(full.payload.as_deref(), Some(&b"value"[..]));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let backend = MemoryBackingStore::new();
        backend.fail_writes(true);

        let entry = Entry::new(b"v".to_vec(), Utc::now());
        assert!(backend.write("k", &entry).await.is_err());
        assert!(backend.delete("k").await.is_err());
        assert_eq!(backend.write_count(), 1);
        assert_eq!(backend.delete_count(), 1);

        backend.fail_reads(true);
        assert!(backend.read("k", true).await.is_err());
    }

    #[tokio::test]
    async fn test_read_missing_key() {
        let backend = MemoryBackingStore::new();
        assert!(backend.read("missing", false).await.is_err());
        assert!(backend.keys().await.unwrap().is_empty());
    }
}
