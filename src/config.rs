//! Configuration Module
//!
//! Handles loading and managing per-instance cache options. Every cache owns
//! its own `Config`; callers override individual fields on top of the defaults.

use std::env;
use std::str::FromStr;

use serde::Deserialize;

/// Cache configuration parameters.
///
/// All values can be configured via builder methods, environment variables or
/// a partial JSON record, each layered over the same defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store every value as its JSON text
    #[serde(alias = "forceString")]
    pub force_string: bool,
    /// Size estimate per own key of a structured value
    #[serde(alias = "objectValueSize")]
    pub object_value_size: i64,
    /// Size estimate for a deferred value
    #[serde(alias = "promiseValueSize")]
    pub promise_value_size: i64,
    /// Size estimate per element of an array value
    #[serde(alias = "arrayValueSize")]
    pub array_value_size: i64,
    /// Default TTL in seconds, `0` = never expires
    #[serde(alias = "stdTTL")]
    pub std_ttl: f64,
    /// Seconds between expiration sweeps, `0` or negative disables the sweep
    #[serde(alias = "checkperiod")]
    pub check_period: f64,
    /// Deep-clone values on the way in and out
    #[serde(alias = "useClones")]
    pub use_clones: bool,
    /// Evict expired entries when they are discovered
    #[serde(alias = "deleteOnExpire")]
    pub delete_on_expire: bool,
    /// Expose the callback-style adapter
    #[serde(alias = "enableLegacyCallbacks")]
    pub enable_legacy_callbacks: bool,
    /// Admission cap on the number of keys, `-1` = unbounded
    #[serde(alias = "maxKeys")]
    pub max_keys: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            force_string: false,
            object_value_size: 80,
            promise_value_size: 80,
            array_value_size: 40,
            std_ttl: 0.0,
            check_period: 600.0,
            use_clones: true,
            delete_on_expire: true,
            enable_legacy_callbacks: false,
            max_keys: -1,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMO_CACHE_FORCE_STRING` (default: false)
    /// - `MEMO_CACHE_OBJECT_VALUE_SIZE` (default: 80)
    /// - `MEMO_CACHE_PROMISE_VALUE_SIZE` (default: 80)
    /// - `MEMO_CACHE_ARRAY_VALUE_SIZE` (default: 40)
    /// - `MEMO_CACHE_STD_TTL` - seconds (default: 0, never expires)
    /// - `MEMO_CACHE_CHECK_PERIOD` - seconds (default: 600)
    /// - `MEMO_CACHE_USE_CLONES` (default: true)
    /// - `MEMO_CACHE_DELETE_ON_EXPIRE` (default: true)
    /// - `MEMO_CACHE_LEGACY_CALLBACKS` (default: false)
    /// - `MEMO_CACHE_MAX_KEYS` (default: -1, unbounded)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            force_string: env_or("MEMO_CACHE_FORCE_STRING", defaults.force_string),
            object_value_size: env_or("MEMO_CACHE_OBJECT_VALUE_SIZE", defaults.object_value_size),
            promise_value_size: env_or(
                "MEMO_CACHE_PROMISE_VALUE_SIZE",
                defaults.promise_value_size,
            ),
            array_value_size: env_or("MEMO_CACHE_ARRAY_VALUE_SIZE", defaults.array_value_size),
            std_ttl: env_or("MEMO_CACHE_STD_TTL", defaults.std_ttl),
            check_period: env_or("MEMO_CACHE_CHECK_PERIOD", defaults.check_period),
            use_clones: env_or("MEMO_CACHE_USE_CLONES", defaults.use_clones),
            delete_on_expire: env_or("MEMO_CACHE_DELETE_ON_EXPIRE", defaults.delete_on_expire),
            enable_legacy_callbacks: env_or(
                "MEMO_CACHE_LEGACY_CALLBACKS",
                defaults.enable_legacy_callbacks,
            ),
            max_keys: env_or("MEMO_CACHE_MAX_KEYS", defaults.max_keys),
        }
    }

    /// Parses a (possibly partial) JSON record and merges it over the defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Enable or disable textual coercion of stored values.
    pub fn with_force_string(mut self, enabled: bool) -> Self {
        self.force_string = enabled;
        self
    }

    /// Set the default TTL in seconds.
    pub fn with_std_ttl(mut self, seconds: f64) -> Self {
        self.std_ttl = seconds;
        self
    }

    /// Set the sweep period in seconds.
    pub fn with_check_period(mut self, seconds: f64) -> Self {
        self.check_period = seconds;
        self
    }

    /// Enable or disable deep cloning.
    pub fn with_use_clones(mut self, enabled: bool) -> Self {
        self.use_clones = enabled;
        self
    }

    /// Choose whether expired entries are evicted on discovery.
    pub fn with_delete_on_expire(mut self, enabled: bool) -> Self {
        self.delete_on_expire = enabled;
        self
    }

    /// Expose the callback-style adapter.
    pub fn with_legacy_callbacks(mut self, enabled: bool) -> Self {
        self.enable_legacy_callbacks = enabled;
        self
    }

    /// Set the key cap, `-1` for unbounded.
    pub fn with_max_keys(mut self, max_keys: i64) -> Self {
        self.max_keys = max_keys;
        self
    }

    /// Override the size heuristic constants.
    pub fn with_value_sizes(mut self, object: i64, promise: i64, array: i64) -> Self {
        self.object_value_size = object;
        self.promise_value_size = promise;
        self.array_value_size = array;
        self
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
