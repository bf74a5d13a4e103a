//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a store.
//!
//! # Tasks
//! - Eviction: deletes expired entries and unloads idle payloads

mod eviction;

pub(crate) use eviction::spawn_eviction_task;
