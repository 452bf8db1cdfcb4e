//! Cache Statistics Module
//!
//! Tracks lookup outcomes plus the key count and approximate key/value sizes.

use serde::Serialize;

// == Cache Stats ==
/// Running cache counters.
///
/// `keys`, `ksize` and `vsize` are signed: resetting the counters while
/// entries remain and then deleting those entries drives them negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of stored keys
    pub keys: i64,
    /// Approximate total size of the keys
    pub ksize: i64,
    /// Approximate total size of the values
    pub vsize: i64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Accounts for a newly stored key.
    pub fn record_insert(&mut self, key_size: i64) {
        self.keys += 1;
        self.ksize += key_size;
    }

    /// Accounts for a removed key and its value.
    pub fn record_remove(&mut self, key_size: i64, value_size: i64) {
        self.keys -= 1;
        self.ksize -= key_size;
        self.vsize -= value_size;
    }

    /// Replaces one value size contribution by another.
    pub fn adjust_value_size(&mut self, removed: i64, added: i64) {
        self.vsize += added - removed;
    }

    /// Resets every counter to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
