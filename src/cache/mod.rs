//! Cache Module
//!
//! Provides the in-memory store with TTL expiry, counters and idle
//! unloading backed by optional write-through persistence.

mod clock;
mod entry;
mod store;
mod validation;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CounterLimits, Entry, Ttl, NO_EXPIRY};
pub use store::{EvictionReport, Store, StoreBuilder};
pub use validation::{key_valid, KEY_PUNCTUATION};

pub(crate) use store::StoreInner;
