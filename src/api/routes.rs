//! API Routes
//!
//! Configures the Axum router with all store endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    counter_handler, delete_handler, get_handler, health_handler, keys_handler, limits_handler,
    set_handler, touch_handler, ttl_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// Keys are captured with wildcards so they may contain `/`.
///
/// # Endpoints
/// - `PUT /set` - Store a value, optionally with a TTL
/// - `GET /get/*key` - Retrieve a value
/// - `DELETE /del/*key` - Delete a key
/// - `GET /keys` - List keys, optionally filtered by `from`/`to`
/// - `GET /ttl/*key` - Remaining TTL in seconds (-1 no expiry, -2 missing)
/// - `POST /touch/*key` - Refresh a key's timestamp
/// - `POST /counter` - Apply a delta to a counter
/// - `PUT /limits` - Set counter boundaries
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/get/*key", get(get_handler))
        .route("/del/*key", delete(delete_handler))
        .route("/keys", get(keys_handler))
        .route("/ttl/*key", get(ttl_handler))
        .route("/touch/*key", post(touch_handler))
        .route("/counter", post(counter_handler))
        .route("/limits", put(limits_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
