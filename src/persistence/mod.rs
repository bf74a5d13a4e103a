//! Persistence Module
//!
//! Durable backends the store writes through to.
//!
//! # Backends
//! - [`FsBackingStore`]: one metadata file and one data file per key
//! - [`MemoryBackingStore`]: process-local map, used in tests
//! - [`WriteBuffer`]: wraps another backend behind a single-consumer queue

mod buffer;
mod filesystem;
mod memory;

use async_trait::async_trait;

use crate::cache::Entry;
use crate::error::PersistenceResult;

pub use buffer::{WriteBuffer, DEFAULT_BUFFER_SIZE};
pub use filesystem::FsBackingStore;
pub use memory::MemoryBackingStore;

/// Capability a durable backend must provide to the store.
///
/// The store calls these concurrently unless the backend is wrapped in a
/// [`WriteBuffer`].
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Persists the entry's metadata, and its payload when loaded.
    async fn write(&self, key: &str, entry: &Entry) -> PersistenceResult<()>;

    /// Reads an entry back. With `with_payload == false` only the metadata
    /// is populated and the returned entry is unloaded.
    async fn read(&self, key: &str, with_payload: bool) -> PersistenceResult<Entry>;

    /// Removes the persisted entry.
    async fn delete(&self, key: &str) -> PersistenceResult<()>;

    /// Lists every persisted key.
    async fn keys(&self) -> PersistenceResult<Vec<String>>;

    /// Releases held resources.
    async fn close(&self);
}
