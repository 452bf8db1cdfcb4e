//! Cache Entry Module
//!
//! Defines the wrapped record stored per key: the value plus its absolute
//! expiry instant.

use chrono::Utc;

use crate::value::Value;

/// Expiry sentinel for entries that never expire.
pub const NEVER_EXPIRES: i64 = 0;

// == Cache Entry ==
/// Represents a single cache entry with value and expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value, owned by the entry
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds), `NEVER_EXPIRES` = no expiration
    pub expires_at: i64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - TTL in seconds; `0` never expires, negative values
    ///   produce an already expired entry
    pub fn new(value: Value, ttl_seconds: f64) -> Self {
        Self {
            value,
            expires_at: expiry_for(ttl_seconds, current_timestamp_ms()),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now` (Unix milliseconds).
    ///
    /// An entry expires once `now` is strictly past its expiry instant.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at != NEVER_EXPIRES && self.expires_at < now
    }

}

/// Absolute expiry for a TTL given in seconds.
///
/// Zero, NaN and positive infinity never expire. Out-of-range TTLs saturate
/// at the ends of the timestamp range.
pub fn expiry_for(ttl_seconds: f64, now: i64) -> i64 {
    if ttl_seconds == 0.0 || ttl_seconds.is_nan() || ttl_seconds == f64::INFINITY {
        return NEVER_EXPIRES;
    }
    let expires_at = now.saturating_add((ttl_seconds * 1000.0) as i64);
    if expires_at == NEVER_EXPIRES {
        // keep the sentinel unambiguous
        -1
    } else {
        expires_at
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
