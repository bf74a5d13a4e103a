//! Store Module
//!
//! The thread-safe in-memory map from key to [`Entry`]. Mutations are
//! written through to every configured backing store; cold reads are served
//! by the first one.

use std::collections::{hash_map, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::{key_valid, Clock, CounterLimits, Entry, SystemClock, Ttl};
use crate::error::{CounterLimit, PersistenceError, Result, StoreError};
use crate::persistence::BackingStore;
use crate::tasks::spawn_eviction_task;

// == Eviction Report ==
/// Outcome of one eviction sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Expired entries deleted
    pub removed: usize,
    /// Idle entries whose payload was dropped from memory
    pub unloaded: usize,
}

impl EvictionReport {
    pub fn is_empty(&self) -> bool {
        self.removed == 0 && self.unloaded == 0
    }
}

// == Store Builder ==
/// Configures and builds a [`Store`].
pub struct StoreBuilder {
    eviction_interval: Duration,
    unload_after: Duration,
    backing: Vec<Arc<dyn BackingStore>>,
    clock: Arc<dyn Clock>,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self {
            eviction_interval: Duration::ZERO,
            unload_after: Duration::ZERO,
            backing: Vec::new(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl StoreBuilder {
    /// How often the eviction sweep runs. Zero disables the background task.
    pub fn eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }

    /// Idle time after which a loaded payload is dropped from memory. Only
    /// applies when a backing store is configured. Zero disables unloading.
    pub fn unload_after(mut self, idle: Duration) -> Self {
        self.unload_after = idle;
        self
    }

    /// Adds a backing store. Every store receives write-through; the first
    /// one added also serves startup reload and cold reads.
    pub fn backing_store(mut self, store: Arc<dyn BackingStore>) -> Self {
        self.backing.push(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Reloads key metadata from the first backing store and starts the
    /// eviction task. Must be called inside a tokio runtime.
    ///
    /// Reload failures are logged and never abort construction.
    pub async fn build(self) -> Store {
        let entries = reload_entries(self.backing.first(), self.clock.as_ref()).await;

        let inner = Arc::new(StoreInner {
            entries: RwLock::new(entries),
            backing: self.backing,
            clock: self.clock,
            unload_after: self.unload_after,
        });

        let shutdown = CancellationToken::new();
        let eviction = (!self.eviction_interval.is_zero()).then(|| {
            spawn_eviction_task(Arc::clone(&inner), self.eviction_interval, shutdown.clone())
        });

        Store {
            inner,
            shutdown,
            eviction: Mutex::new(eviction),
        }
    }
}

async fn reload_entries(
    first: Option<&Arc<dyn BackingStore>>,
    clock: &dyn Clock,
) -> HashMap<String, Entry> {
    let mut entries = HashMap::new();
    let Some(first) = first else {
        return entries;
    };

    let keys = match first.keys().await {
        Ok(keys) => keys,
        Err(err) => {
            warn!("Startup reload skipped, listing persisted keys failed: {}", err);
            return entries;
        }
    };

    for key in keys {
        let entry = match first.read(&key, false).await {
            Ok(mut entry) => {
                entry.unload();
                entry
            }
            Err(err) => {
                warn!("Reading metadata for key {} failed, keeping a placeholder: {}", key, err);
                Entry::placeholder(clock.now())
            }
        };
        entries.insert(key, entry);
    }

    info!("Reloaded {} keys from backing store", entries.len());
    entries
}

// == Store ==
/// Concurrent key-value cache with TTL expiry, idle unloading and
/// write-through persistence.
pub struct Store {
    inner: Arc<StoreInner>,
    shutdown: CancellationToken,
    eviction: Mutex<Option<JoinHandle<()>>>,
}

/// State shared between the [`Store`] handle and its eviction task.
pub(crate) struct StoreInner {
    entries: RwLock<HashMap<String, Entry>>,
    backing: Vec<Arc<dyn BackingStore>>,
    clock: Arc<dyn Clock>,
    unload_after: Duration,
}

/// Stores `entry` under `key`, replacing any expired leftover, and returns
/// the stored entry so it can be written through.
fn replace_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    entry: Entry,
) -> &'a mut Entry {
    match entries.entry(key.to_string()) {
        hash_map::Entry::Occupied(slot) => {
            let slot = slot.into_mut();
            *slot = entry;
            slot
        }
        hash_map::Entry::Vacant(slot) => slot.insert(entry),
    }
}

fn check_key(key: &str) -> Result<()> {
    if key_valid(key) {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

impl Store {
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    // == Set ==
    /// Stores `value` under `key`, refreshing its timestamp.
    ///
    /// The entry keeps its TTL and any counter limits. An integer payload on
    /// a key without limits makes it a full-range counter.
    pub async fn set(&self, key: &str, value: impl Into<Vec<u8>>) -> Result<()> {
        check_key(key)?;
        let mut entries = self.inner.entries.write().await;
        let now = self.inner.clock.now();

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::placeholder(now));
        entry.set_payload(value.into());
        entry.timestamp = now;
        self.inner.persist(key, entry).await
    }

    // == Get ==
    /// Returns a copy of the payload, loading it from the first backing
    /// store when it has been unloaded.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        check_key(key)?;
        {
            let entries = self.inner.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(self.inner.clock.now()) => {
                    if let Some(payload) = &entry.payload {
                        return Ok(payload.clone());
                    }
                }
                _ => return Err(StoreError::NotFound(key.to_string())),
            }
        }
        self.inner.load_payload(key).await
    }

    // == Delete ==
    /// Removes the entry and deletes it from every backing store.
    ///
    /// All backing stores are attempted; the first failure is returned and
    /// the in-memory removal stands.
    pub async fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        let mut entries = self.inner.entries.write().await;
        self.inner.delete_locked(&mut entries, key).await
    }

    /// True if the key exists and its payload is in memory.
    pub async fn in_memory(&self, key: &str) -> Result<bool> {
        check_key(key)?;
        let entries = self.inner.entries.read().await;
        Ok(entries.get(key).is_some_and(Entry::is_loaded))
    }

    /// Every tracked key, loaded or not, in no particular order.
    pub async fn keys(&self) -> Vec<String> {
        self.inner.entries.read().await.keys().cloned().collect()
    }

    /// Live keys whose timestamp falls within `[from, to]`.
    pub async fn query_keys(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<String> {
        let entries = self.inner.entries.read().await;
        let now = self.inner.clock.now();
        entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .filter(|(_, entry)| entry.timestamp >= from && entry.timestamp <= to)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of tracked keys.
    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // == TTL ==
    /// Sets the TTL in seconds; negative means never expire.
    pub async fn set_ttl(&self, key: &str, seconds: i64) -> Result<()> {
        check_key(key)?;
        let mut entries = self.inner.entries.write().await;
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        entry.ttl = seconds;
        self.inner.persist(key, entry).await
    }

    /// Remaining lifetime of `key`.
    pub async fn ttl(&self, key: &str) -> Result<Ttl> {
        check_key(key)?;
        let entries = self.inner.entries.read().await;
        Ok(entries
            .get(key)
            .map_or(Ttl::KeyNotFound, |entry| entry.ttl_remaining(self.inner.clock.now())))
    }

    /// Refreshes the timestamp of a live entry.
    pub async fn touch(&self, key: &str) -> Result<()> {
        check_key(key)?;
        let mut entries = self.inner.entries.write().await;
        let now = self.inner.clock.now();
        let entry = entries
            .get_mut(key)
            .filter(|entry| !entry.is_expired(now))
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        entry.timestamp = now;
        self.inner.persist(key, entry).await
    }

    // == Counters ==
    /// Adds `delta` to an integer entry and returns the new value.
    ///
    /// A missing (or expired) key becomes a full-range counter holding
    /// `delta`. An update that would leave the counter limits fails without
    /// changing the stored value.
    pub async fn counter(&self, key: &str, delta: i64) -> Result<i64> {
        check_key(key)?;
        let mut entries = self.inner.entries.write().await;
        let now = self.inner.clock.now();

        let Some(entry) = entries.get_mut(key).filter(|entry| !entry.is_expired(now)) else {
            let entry = Entry::new(delta.to_string().into_bytes(), now);
            let entry = replace_entry(&mut entries, key, entry);
            self.inner.persist(key, entry).await?;
            return Ok(delta);
        };

        self.inner.ensure_loaded(key, entry).await?;
        let current = entry
            .counter_value()
            .map_err(|source| StoreError::CounterParse {
                key: key.to_string(),
                source,
            })?;
        let limits = entry
            .counter
            .ok_or_else(|| StoreError::CounterBoundsUnset(key.to_string()))?;

        let exceeded = |limit| StoreError::CounterLimitExceeded {
            key: key.to_string(),
            limit,
        };
        let next = match current.checked_add(delta) {
            Some(next) if next > limits.max => return Err(exceeded(CounterLimit::Maximum)),
            Some(next) if next < limits.min => return Err(exceeded(CounterLimit::Minimum)),
            Some(next) => next,
            None if delta > 0 => return Err(exceeded(CounterLimit::Maximum)),
            None => return Err(exceeded(CounterLimit::Minimum)),
        };

        entry.set_payload(next.to_string().into_bytes());
        entry.timestamp = now;
        self.inner.persist(key, entry).await?;
        Ok(next)
    }

    /// Sets the counter limits of `key`.
    ///
    /// A missing key is created holding `min`. The current value is not
    /// checked against the new limits.
    pub async fn set_counter_limits(&self, key: &str, min: i64, max: i64) -> Result<()> {
        check_key(key)?;
        let mut entries = self.inner.entries.write().await;
        let now = self.inner.clock.now();

        let Some(entry) = entries.get_mut(key).filter(|entry| !entry.is_expired(now)) else {
            let mut entry = Entry::new(min.to_string().into_bytes(), now);
            entry.counter = Some(CounterLimits::new(min, max));
            let entry = replace_entry(&mut entries, key, entry);
            return self.inner.persist(key, entry).await;
        };

        let limits = entry
            .counter
            .as_mut()
            .ok_or_else(|| StoreError::NotACounter(key.to_string()))?;
        *limits = CounterLimits::new(min, max);
        self.inner.persist(key, entry).await
    }

    // == Eviction ==
    /// Runs one eviction sweep immediately.
    pub async fn run_eviction_check(&self) -> EvictionReport {
        self.inner.run_eviction_check().await
    }

    // == Close ==
    /// Stops the eviction task, waits for it to exit, then closes every
    /// backing store. Later calls wait for the first one to finish, then do
    /// nothing.
    pub async fn close(&self) {
        // Held for the whole shutdown
        let mut eviction = self.eviction.lock().await;
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();

        if let Some(handle) = eviction.take() {
            if let Err(err) = handle.await {
                warn!("Eviction task ended abnormally: {}", err);
            }
        }
        for store in &self.inner.backing {
            store.close().await;
        }
        info!("Store closed");
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl StoreInner {
    /// Writes `entry` to every backing store in order, returning the first
    /// failure.
    async fn persist(&self, key: &str, entry: &Entry) -> Result<()> {
        let mut first_error: Option<PersistenceError> = None;
        for store in &self.backing {
            if let Err(err) = store.write(key, entry).await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), |err| Err(err.into()))
    }

    /// Removes `key` and deletes it from every backing store.
    async fn delete_locked(&self, entries: &mut HashMap<String, Entry>, key: &str) -> Result<()> {
        if entries.remove(key).is_none() {
            return Err(StoreError::NotFound(key.to_string()));
        }

        let mut first_error: Option<PersistenceError> = None;
        for store in &self.backing {
            if let Err(err) = store.delete(key).await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), |err| Err(err.into()))
    }

    /// Cold path of `get`: the backing store is read without holding the
    /// lock, then the payload is merged unless another reader or writer got
    /// there first.
    async fn load_payload(&self, key: &str) -> Result<Vec<u8>> {
        let Some(first) = self.backing.first() else {
            return Ok(Vec::new());
        };
        let payload = first.read(key, true).await?.payload.unwrap_or_default();

        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) => match &entry.payload {
                Some(current) => Ok(current.clone()),
                None => {
                    debug!("Reloaded payload for key {}", key);
                    entry.set_payload(payload.clone());
                    Ok(payload)
                }
            },
            None => Ok(payload),
        }
    }

    /// Loads an unloaded entry's payload while the caller holds the
    /// exclusive lock.
    async fn ensure_loaded(&self, key: &str, entry: &mut Entry) -> Result<()> {
        if entry.is_loaded() {
            return Ok(());
        }
        if let Some(first) = self.backing.first() {
            let persisted = first.read(key, true).await?;
            entry.set_payload(persisted.payload.unwrap_or_default());
        }
        Ok(())
    }

    /// Deletes expired entries and unloads idle ones.
    ///
    /// Candidates are collected under the shared lock and re-checked under
    /// the exclusive lock, so entries written in between survive.
    pub(crate) async fn run_eviction_check(&self) -> EvictionReport {
        let can_unload = !self.backing.is_empty();
        let now = self.clock.now();
        let is_idle = |entry: &Entry| {
            can_unload && entry.is_loaded() && entry.is_idle(now, self.unload_after)
        };

        let (expired, idle): (Vec<String>, Vec<String>) = {
            let entries = self.entries.read().await;
            let mut expired = Vec::new();
            let mut idle = Vec::new();
            for (key, entry) in entries.iter() {
                if entry.is_expired(now) {
                    expired.push(key.clone());
                } else if is_idle(entry) {
                    idle.push(key.clone());
                }
            }
            (expired, idle)
        };

        let mut report = EvictionReport::default();
        if expired.is_empty() && idle.is_empty() {
            return report;
        }

        let mut entries = self.entries.write().await;
        for key in expired {
            if !entries.get(&key).is_some_and(|entry| entry.is_expired(now)) {
                continue;
            }
            report.removed += 1;
            if let Err(err) = self.delete_locked(&mut entries, &key).await {
                error!("Eviction: deleting expired key {} failed: {}", key, err);
            }
        }
        for key in idle {
            if let Some(entry) = entries.get_mut(&key).filter(|entry| is_idle(entry)) {
                entry.unload();
                report.unloaded += 1;
            }
        }
        report
    }
}
