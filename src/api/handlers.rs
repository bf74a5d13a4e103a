//! API Handlers
//!
//! HTTP request handlers exposing the store operations.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::Store;
use crate::config::Config;
use crate::error::{PersistenceResult, Result};
use crate::models::{
    CounterRequest, CounterResponse, DeleteResponse, GetResponse, HealthResponse, KeysQuery,
    KeysResponse, LimitsRequest, LimitsResponse, SetRequest, SetResponse, TouchResponse,
    TtlResponse,
};
use crate::persistence::{BackingStore, FsBackingStore, WriteBuffer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The store; it synchronizes internally
    pub store: Arc<Store>,
}

impl AppState {
    /// Creates a new AppState around the given store.
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Builds the store described by the configuration.
    ///
    /// Each persistence directory gets a filesystem backing store wrapped in
    /// a write buffer; the data directory comes first.
    pub async fn from_config(config: &Config) -> PersistenceResult<Self> {
        let mut builder = Store::builder()
            .eviction_interval(config.eviction_interval())
            .unload_after(config.unload_after());

        for dir in config.persistence_dirs() {
            let filesystem: Arc<dyn BackingStore> = Arc::new(FsBackingStore::new(dir)?);
            builder = builder.backing_store(Arc::new(WriteBuffer::new(
                filesystem,
                config.write_buffer_size,
            )));
        }

        Ok(Self::new(builder.build().await))
    }
}

/// Handler for PUT /set
///
/// Stores a value and, when given, applies its TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    state.store.set(&req.key, req.value.into_bytes()).await?;
    if let Some(ttl) = req.ttl {
        state.store.set_ttl(&req.key, ttl).await?;
    }

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/*key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state.store.get(&key).await?;

    Ok(Json(GetResponse::new(key, &value)))
}

/// Handler for DELETE /del/*key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.store.delete(&key).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /keys
///
/// Lists every key, or only live keys written within `from..=to` when both
/// query parameters are given.
pub async fn keys_handler(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> Json<KeysResponse> {
    let keys = match query.range() {
        Some((from, to)) => state.store.query_keys(from, to).await,
        None => state.store.keys().await,
    };

    Json(KeysResponse::new(keys))
}

/// Handler for GET /ttl/*key
pub async fn ttl_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TtlResponse>> {
    let ttl = state.store.ttl(&key).await?.as_seconds();

    Ok(Json(TtlResponse { key, ttl }))
}

/// Handler for POST /touch/*key
pub async fn touch_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TouchResponse>> {
    state.store.touch(&key).await?;

    Ok(Json(TouchResponse::new(key)))
}

/// Handler for POST /counter
pub async fn counter_handler(
    State(state): State<AppState>,
    Json(req): Json<CounterRequest>,
) -> Result<Json<CounterResponse>> {
    let value = state.store.counter(&req.key, req.delta).await?;

    Ok(Json(CounterResponse {
        key: req.key,
        value,
    }))
}

/// Handler for PUT /limits
pub async fn limits_handler(
    State(state): State<AppState>,
    Json(req): Json<LimitsRequest>,
) -> Result<Json<LimitsResponse>> {
    state
        .store
        .set_counter_limits(&req.key, req.min, req.max)
        .await?;

    Ok(Json(LimitsResponse {
        key: req.key,
        min: req.min,
        max: req.max,
    }))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.store.len().await))
}
