//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.
//! Key validity is enforced by the store itself.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The key to store the value under
/// - `value`: The value to store, as UTF-8 text
/// - `ttl`: Optional TTL in seconds applied after the write
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub ttl: Option<i64>,
}

/// Request body for POST /counter
#[derive(Debug, Clone, Deserialize)]
pub struct CounterRequest {
    pub key: String,
    /// Amount to add, may be negative
    pub delta: i64,
}

/// Request body for PUT /limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsRequest {
    pub key: String,
    pub min: i64,
    pub max: i64,
}

/// Query string for GET /keys
///
/// Both bounds (RFC 3339) must be present for a time-range query; otherwise
/// every key is listed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysQuery {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl KeysQuery {
    /// The requested `[from, to]` range, if complete.
    pub fn range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.from.zip(self.to)
    }
}
