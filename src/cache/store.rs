//! Cache Store Module
//!
//! Main cache engine: HashMap storage of wrapped entries, statistics
//! bookkeeping, lazy expiration and the size heuristic. The store is purely
//! synchronous; notifications it produces are queued in an outbox that the
//! owner drains and publishes once the store is no longer borrowed.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::cache::entry::{current_timestamp_ms, expiry_for, CacheEntry};
use crate::cache::key::{AsKey, BatchEntry, Key, KeyList};
use crate::cache::CacheStats;
use crate::clone::deep_clone;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::events::CacheEvent;
use crate::value::{to_json_string, Value};

/// Size estimate for numbers and booleans.
const PRIMITIVE_VALUE_SIZE: i64 = 8;

// == Cache Store ==
/// Main cache storage with TTL support.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage, keyed by the textual form of the key
    entries: HashMap<String, CacheEntry>,
    /// Running statistics
    stats: CacheStats,
    /// Per-instance options
    config: Config,
    /// Notifications not yet published
    outbox: Vec<CacheEvent>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new, empty CacheStore.
    pub fn new(config: Config) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            config,
            outbox: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // == Set ==
    /// Stores a value under `key`.
    ///
    /// The capacity check runs first and applies to updates as well. Without
    /// an explicit `ttl` the configured default is used; `Some(0.0)` never
    /// expires.
    ///
    /// # Errors
    /// - `ECACHEFULL` if `max_keys` is reached
    /// - `EKEYTYPE` for an invalid key
    /// - `ESERIALIZE` if forced-string storage meets a cyclic value
    pub fn set<K: AsKey>(&mut self, key: K, value: Value, ttl: Option<f64>) -> Result<bool> {
        self.check_capacity(1)?;
        let value = self.coerce(value)?;
        let ttl = ttl.unwrap_or(self.config.std_ttl);
        let key = key.to_key()?;
        self.insert(key, value, ttl);
        Ok(true)
    }

    // == Multi Set ==
    /// Stores a batch of entries. Every key and TTL is validated before the
    /// first write.
    ///
    /// The capacity check compares the current key count plus the batch
    /// length against `max_keys`, whether or not batch keys already exist.
    pub fn mset(&mut self, batch: &[BatchEntry]) -> Result<bool> {
        let incoming = i64::try_from(batch.len()).unwrap_or(i64::MAX);
        if self.config.max_keys > -1 && self.stats.keys.saturating_add(incoming) >= self.config.max_keys {
            warn!(max_keys = self.config.max_keys, batch = batch.len(), "Cache full, rejecting batch");
            return Err(CacheError::CacheFull);
        }

        let mut prepared = Vec::with_capacity(batch.len());
        for entry in batch {
            let ttl = entry.resolved_ttl()?;
            let key = entry.key.to_key()?;
            prepared.push((key, ttl));
        }
        let mut values = Vec::with_capacity(batch.len());
        for entry in batch {
            values.push(self.coerce(entry.val.clone())?);
        }

        for ((key, ttl), value) in prepared.into_iter().zip(values) {
            let ttl = ttl.unwrap_or(self.config.std_ttl);
            self.insert(key, value, ttl);
        }
        Ok(true)
    }

    fn insert(&mut self, key: Key, value: Value, ttl: f64) {
        let storage_key = key.storage_key();
        let value_size = self.value_size(&value);
        let entry = CacheEntry::new(self.isolate(&value), ttl);

        match self.entries.insert(storage_key.clone(), entry) {
            Some(previous) => {
                let previous_size = self.value_size(&previous.value);
                self.stats.adjust_value_size(previous_size, value_size);
            }
            None => {
                self.stats.record_insert(text_size(&storage_key));
                self.stats.adjust_value_size(0, value_size);
            }
        }

        self.outbox.push(CacheEvent::Set {
            key: storage_key,
            value,
        });
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns a copy of the value if it is live (a shared reference when
    /// cloning is disabled), `None` otherwise. Counts a hit or a miss.
    pub fn get<K: AsKey>(&mut self, key: K) -> Result<Option<Value>> {
        let storage_key = key.to_key()?.storage_key();
        Ok(self.lookup(&storage_key))
    }

    fn lookup(&mut self, storage_key: &str) -> Option<Value> {
        if self.is_live(storage_key) {
            self.stats.record_hit();
            self.entries
                .get(storage_key)
                .map(|entry| unwrap_stored(self.config.use_clones, &entry.value))
        } else {
            self.stats.record_miss();
            None
        }
    }

    // == Multi Get ==
    /// Retrieves several keys. Keys that miss are absent from the result.
    pub fn mget<L: KeyList>(&mut self, keys: L) -> Result<HashMap<String, Value>> {
        let keys = keys.to_keys()?;
        let mut found = HashMap::new();
        for key in keys {
            let storage_key = key.storage_key();
            if let Some(value) = self.lookup(&storage_key) {
                found.insert(storage_key, value);
            }
        }
        Ok(found)
    }

    // == Delete ==
    /// Removes an entry by key. Returns the number of entries removed.
    pub fn del<K: AsKey>(&mut self, key: K) -> Result<usize> {
        let storage_key = key.to_key()?.storage_key();
        Ok(usize::from(self.remove(&storage_key)))
    }

    /// Removes several entries. All keys are validated first; absent keys are skipped.
    pub fn del_many<L: KeyList>(&mut self, keys: L) -> Result<usize> {
        let keys = keys.to_keys()?;
        Ok(keys
            .iter()
            .filter(|key| self.remove(&key.storage_key()))
            .count())
    }

    fn remove(&mut self, storage_key: &str) -> bool {
        let Some(entry) = self.entries.remove(storage_key) else {
            return false;
        };
        let value_size = self.value_size(&entry.value);
        self.stats.record_remove(text_size(storage_key), value_size);
        self.outbox.push(CacheEvent::Del {
            key: storage_key.to_string(),
            value: entry.value,
        });
        true
    }

    // == Take ==
    /// Gets a live value and deletes it in the same step.
    pub fn take<K: AsKey>(&mut self, key: K) -> Result<Option<Value>> {
        let storage_key = key.to_key()?.storage_key();
        let value = self.lookup(&storage_key);
        if value.is_some() {
            self.remove(&storage_key);
        }
        Ok(value)
    }

    // == Has ==
    /// Liveness check without hit/miss accounting. Invalid keys are never present.
    pub fn has<K: AsKey>(&mut self, key: K) -> bool {
        match key.to_key() {
            Ok(key) => self.is_live(&key.storage_key()),
            Err(_) => false,
        }
    }

    // == TTL ==
    /// Reassigns the TTL of a live key without touching its value.
    ///
    /// A missing or zero `ttl` falls back to the configured default. A
    /// negative TTL deletes the key. Returns `false` for falsy, absent or
    /// expired keys.
    pub fn ttl<K: AsKey>(&mut self, key: K, ttl: Option<f64>) -> Result<bool> {
        let ttl = match ttl {
            Some(ttl) if ttl != 0.0 && !ttl.is_nan() => ttl,
            _ => self.config.std_ttl,
        };
        if key.is_falsy() {
            return Ok(false);
        }
        let storage_key = key.to_key()?.storage_key();
        if !self.is_live(&storage_key) {
            return Ok(false);
        }

        if ttl >= 0.0 {
            if let Some(entry) = self.entries.get_mut(&storage_key) {
                entry.expires_at = expiry_for(ttl, current_timestamp_ms());
            }
        } else {
            self.remove(&storage_key);
        }
        Ok(true)
    }

    // == Get TTL ==
    /// Absolute expiry (Unix milliseconds, `0` = never) of a live key.
    pub fn get_ttl<K: AsKey>(&mut self, key: K) -> Result<Option<i64>> {
        if key.is_falsy() {
            return Ok(None);
        }
        let storage_key = key.to_key()?.storage_key();
        if !self.is_live(&storage_key) {
            return Ok(None);
        }
        Ok(self.entries.get(&storage_key).map(|entry| entry.expires_at))
    }

    // == Keys ==
    /// Every stored key, live or not.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    // == Flush ==
    /// Removes every entry and resets the statistics.
    pub fn flush_all(&mut self) {
        self.entries.clear();
        self.stats.reset();
        self.outbox.push(CacheEvent::Flush);
    }

    /// Resets the statistics, keeping the entries.
    pub fn flush_stats(&mut self) {
        self.stats.reset();
        self.outbox.push(CacheEvent::FlushStats);
    }

    // == Expiration ==
    /// Runs the liveness check over every stored entry.
    ///
    /// Returns the number of entries found expired.
    pub fn check_expired(&mut self) -> usize {
        let keys = self.keys();
        keys.iter().filter(|key| !self.is_live(key)).count()
    }

    /// Liveness check.
    ///
    /// An entry past its expiry is not live: it is evicted when
    /// `delete_on_expire` is set, and an `expired` notification is queued
    /// either way.
    fn is_live(&mut self, storage_key: &str) -> bool {
        let Some(entry) = self.entries.get(storage_key) else {
            return false;
        };
        if !entry.is_expired_at(current_timestamp_ms()) {
            return true;
        }

        let stale = unwrap_stored(self.config.use_clones, &entry.value);
        if self.config.delete_on_expire {
            self.remove(storage_key);
        }
        trace!(key = storage_key, "Entry expired");
        self.outbox.push(CacheEvent::Expired {
            key: storage_key.to_string(),
            value: stale,
        });
        false
    }

    /// Drains the queued notifications.
    pub fn take_events(&mut self) -> Vec<CacheEvent> {
        std::mem::take(&mut self.outbox)
    }

    // == Length ==
    /// Returns the current number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Size Heuristic ==
    /// Approximate cost of a value, by first matching rule:
    /// string length; JSON text length under forced-string storage;
    /// per-element cost for arrays; 8 for numbers and booleans; a fixed cost
    /// for deferred values; byte length for buffers; per-key cost for
    /// objects; 0 otherwise.
    pub fn value_size(&self, value: &Value) -> i64 {
        let config = &self.config;
        match value {
            Value::String(s) => text_size(s),
            _ if config.force_string => to_json_string(value)
                .ok()
                .flatten()
                .map(|text| text_size(&text))
                .unwrap_or(0),
            Value::Array(items) => config.array_value_size * items.read().len() as i64,
            Value::Number(_) | Value::Bool(_) => PRIMITIVE_VALUE_SIZE,
            Value::Deferred(_) => config.promise_value_size,
            Value::Bytes(bytes) => bytes.read().len() as i64,
            Value::Object(object) | Value::Error(object) => {
                config.object_value_size * object.read().keys().len() as i64
            }
            _ => 0,
        }
    }

    fn check_capacity(&self, incoming: i64) -> Result<()> {
        let max_keys = self.config.max_keys;
        if max_keys > -1 && self.stats.keys + incoming > max_keys {
            warn!(max_keys, "Cache full, rejecting set");
            return Err(CacheError::CacheFull);
        }
        Ok(())
    }

    fn coerce(&self, value: Value) -> Result<Value> {
        if !self.config.force_string || matches!(value, Value::String(_)) {
            return Ok(value);
        }
        Ok(match to_json_string(&value)? {
            Some(text) => Value::String(text),
            None => value,
        })
    }

    fn isolate(&self, value: &Value) -> Value {
        isolate(self.config.use_clones, value)
    }
}

fn isolate(use_clones: bool, value: &Value) -> Value {
    if use_clones {
        deep_clone(value)
    } else {
        value.clone()
    }
}

/// Outbound copy of a stored value; a stored `undefined` reads back as `null`.
fn unwrap_stored(use_clones: bool, value: &Value) -> Value {
    match value {
        Value::Undefined | Value::Null => Value::Null,
        _ => isolate(use_clones, value),
    }
}

fn text_size(text: &str) -> i64 {
    text.chars().count() as i64
}
