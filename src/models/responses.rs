//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

/// Response body for the GET operation (GET /get/*key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value, lossily decoded as UTF-8
    pub value: String,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: &[u8]) -> Self {
        Self {
            key: key.into(),
            value: String::from_utf8_lossy(value).into_owned(),
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/*key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for POST /touch/*key
#[derive(Debug, Clone, Serialize)]
pub struct TouchResponse {
    pub message: String,
    pub key: String,
}

impl TouchResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' touched", key),
            key,
        }
    }
}

/// Response body for PUT /limits
#[derive(Debug, Clone, Serialize)]
pub struct LimitsResponse {
    pub key: String,
    pub min: i64,
    pub max: i64,
}

/// Response body for GET /keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
    pub count: usize,
}

impl KeysResponse {
    /// Creates a KeysResponse with the keys sorted for stable output
    pub fn new(mut keys: Vec<String>) -> Self {
        keys.sort();
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for GET /ttl/*key
///
/// `ttl` is `-2` for a missing key, `-1` when no expiry is set, otherwise
/// the remaining seconds.
#[derive(Debug, Clone, Serialize)]
pub struct TtlResponse {
    pub key: String,
    pub ttl: i64,
}

/// Response body for POST /counter
#[derive(Debug, Clone, Serialize)]
pub struct CounterResponse {
    pub key: String,
    pub value: i64,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Number of keys tracked by the store
    pub keys: usize,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(keys: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            keys,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
