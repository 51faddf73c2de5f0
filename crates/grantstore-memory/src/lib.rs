//! In-memory backend for the `grantstore` token adapter.
//!
//! [`MemoryStore`] implements [`grantstore::KeyValueStore`] inside the
//! process. Expiry is driven by a pluggable [`Clock`], so tests can move time
//! forward with [`ManualClock`] instead of sleeping.
//!
//! ```ignore
//! use std::sync::Arc;
//! use grantstore::TokenAdapter;
//! use grantstore_memory::{ManualClock, MemoryStore};
//!
//! let clock = ManualClock::new();
//! let store = MemoryStore::with_clock(Arc::new(clock.clone()));
//! let adapter = TokenAdapter::new(Arc::new(store));
//! ```

mod clock;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::MemoryStore;
