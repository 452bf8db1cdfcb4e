//! Cache Module
//!
//! Provides the synchronous key/value store with TTL expiration, statistics
//! and the key types its operations accept.

mod entry;
mod key;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, NEVER_EXPIRES};
pub use key::{AsKey, BatchEntry, Key, KeyList};
pub use stats::CacheStats;
pub use store::CacheStore;
