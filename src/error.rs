//! Error types for the key-value store
//!
//! Provides unified error handling using thiserror.

use std::fmt;
use std::num::ParseIntError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Counter Limit ==
/// Which counter boundary an update would have crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterLimit {
    Maximum,
    Minimum,
}

impl fmt::Display for CounterLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterLimit::Maximum => f.write_str("maximum"),
            CounterLimit::Minimum => f.write_str("minimum"),
        }
    }
}

// == Persistence Error Enum ==
/// Failures surfaced by a backing store.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key cannot be mapped onto a storage path
    #[error("Invalid storage path for key: {0}")]
    InvalidPath(String),

    /// The write buffer has been closed
    #[error("Backing store is closed")]
    Closed,

    /// Any other backend-specific failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// == Store Error Enum ==
/// Unified error type for store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Key contains characters outside the allowed set
    #[error("Key contains invalid characters: {0:?}")]
    InvalidKey(String),

    /// Key absent or expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Stored payload is not a base-10 integer
    #[error("Counter value for key {key} is not an integer: {source}")]
    CounterParse {
        key: String,
        #[source]
        source: ParseIntError,
    },

    /// Counter key without boundaries
    #[error("Counter boundaries not set for key: {0}")]
    CounterBoundsUnset(String),

    /// Update would leave the `[min, max]` range
    #[error("Counter {limit} value reached for key: {key}")]
    CounterLimitExceeded { key: String, limit: CounterLimit },

    /// Limits requested on a key that is not a counter
    #[error("Key is not a counter: {0}")]
    NotACounter(String),

    /// Write-through or cold read failure
    #[error("Backing store error: {0}")]
    Backing(#[from] PersistenceError),
}

// == IntoResponse Implementation ==
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            StoreError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::CounterParse { .. }
            | StoreError::CounterBoundsUnset(_)
            | StoreError::CounterLimitExceeded { .. }
            | StoreError::NotACounter(_) => StatusCode::CONFLICT,
            StoreError::Backing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Aliases ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Result type returned by backing stores.
pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;
