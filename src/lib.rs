//! Tiered KV - An in-memory key-value store with write-through persistence
//!
//! Entries carry optional TTLs and bounded counters. Idle payloads are
//! unloaded from memory and reloaded on demand from the backing stores.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod persistence;
mod tasks;

pub use api::{create_router, AppState};
pub use cache::{Store, StoreBuilder, Ttl};
pub use config::Config;
pub use error::{PersistenceError, StoreError};
pub use persistence::{BackingStore, FsBackingStore, MemoryBackingStore, WriteBuffer};
