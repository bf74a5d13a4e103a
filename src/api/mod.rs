//! API Module
//!
//! HTTP handlers and routing for the store's REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a value
//! - `GET /get/*key` - Retrieve a value by key
//! - `DELETE /del/*key` - Delete a key
//! - `GET /keys` - List keys
//! - `GET /ttl/*key`, `POST /touch/*key` - Expiry inspection and refresh
//! - `POST /counter`, `PUT /limits` - Bounded counters
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
