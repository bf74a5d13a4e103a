//! Cache Entry Module
//!
//! Defines the unit of stored state. An entry is either loaded (payload in
//! memory) or unloaded (metadata only, payload held by a backing store).

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// TTL value meaning "never expires".
pub const NO_EXPIRY: i64 = -1;

// == Counter Limits ==
/// Inclusive bounds for a counter-typed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterLimits {
    pub min: i64,
    pub max: i64,
}

impl CounterLimits {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Bounds spanning the whole `i64` range.
    pub fn full_range() -> Self {
        Self::new(i64::MIN, i64::MAX)
    }
}

// == Ttl ==
/// Result of a TTL query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key is not tracked by the store
    KeyNotFound,
    /// The key exists and never expires
    NoExpiry,
    /// Whole seconds left, rounded up
    Remaining(u64),
}

impl Ttl {
    /// Wire representation: `-2` missing key, `-1` no expiry, otherwise seconds.
    pub fn as_seconds(self) -> i64 {
        match self {
            Ttl::KeyNotFound => -2,
            Ttl::NoExpiry => NO_EXPIRY,
            Ttl::Remaining(secs) => i64::try_from(secs).unwrap_or(i64::MAX),
        }
    }
}

// == Entry ==
/// A stored value together with its metadata.
///
/// Only the metadata is serialized; backing stores persist the payload
/// separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Value bytes, `None` while unloaded
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
    /// Last write or touch time
    pub timestamp: DateTime<Utc>,
    /// Seconds after `timestamp` at which the entry expires, negative = never
    pub ttl: i64,
    /// Present iff the entry is counter-typed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<CounterLimits>,
}

impl Entry {
    // == Constructors ==
    /// Creates a loaded entry. Integer payloads become counters spanning the
    /// full `i64` range.
    pub fn new(payload: Vec<u8>, now: DateTime<Utc>) -> Self {
        let mut entry = Self {
            payload: None,
            timestamp: now,
            ttl: NO_EXPIRY,
            counter: None,
        };
        entry.set_payload(payload);
        entry
    }

    /// Metadata-only stand-in used when a persisted entry cannot be read at
    /// startup.
    pub fn placeholder(now: DateTime<Utc>) -> Self {
        Self {
            payload: None,
            timestamp: now,
            ttl: NO_EXPIRY,
            counter: None,
        }
    }

    // == Payload ==
    /// Replaces the payload and marks the entry loaded.
    ///
    /// Existing counter limits are kept whatever the new payload is.
    pub fn set_payload(&mut self, payload: Vec<u8>) {
        if self.counter.is_none() && parse_integer(&payload).is_ok() {
            self.counter = Some(CounterLimits::full_range());
        }
        self.payload = Some(payload);
    }

    pub fn is_loaded(&self) -> bool {
        self.payload.is_some()
    }

    /// Drops the payload from memory, keeping the metadata.
    pub fn unload(&mut self) {
        self.payload = None;
    }

    /// Parses the payload as a base-10 signed integer.
    pub fn counter_value(&self) -> Result<i64, std::num::ParseIntError> {
        parse_integer(self.payload.as_deref().unwrap_or_default())
    }

    // == Expiry ==
    /// Instant at which the entry expires, `None` if it never does.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.ttl < 0 {
            return None;
        }
        TimeDelta::try_seconds(self.ttl).and_then(|ttl| self.timestamp.checked_add_signed(ttl))
    }

    /// An entry is expired once `now` reaches `timestamp + ttl`, so a TTL of
    /// zero expires immediately.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires| now >= expires)
    }

    /// True when the entry has not been written for longer than `unload_after`.
    /// A zero threshold disables unloading.
    pub fn is_idle(&self, now: DateTime<Utc>, unload_after: Duration) -> bool {
        if unload_after.is_zero() {
            return false;
        }
        (now - self.timestamp)
            .to_std()
            .is_ok_and(|idle| idle > unload_after)
    }

    // == Time To Live ==
    /// Remaining lifetime in whole seconds, rounded up and floored at zero.
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> Ttl {
        if self.ttl < 0 {
            return Ttl::NoExpiry;
        }
        let Some(expires) = self.expires_at() else {
            return Ttl::Remaining(u64::MAX);
        };
        let nanos = (expires - now).num_nanoseconds().unwrap_or(i64::MAX);
        if nanos <= 0 {
            return Ttl::Remaining(0);
        }
        Ttl::Remaining((nanos as u64).div_ceil(1_000_000_000))
    }
}

fn parse_integer(bytes: &[u8]) -> Result<i64, std::num::ParseIntError> {
    String::from_utf8_lossy(bytes).parse::<i64>()
}
