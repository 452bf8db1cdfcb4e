//! Callback-style adapter
//!
//! Mirrors the core operations, delivering each outcome to a completion
//! callback instead of returning it. Errors are passed to the callback
//! rather than propagated.

use std::collections::HashMap;

use crate::api::Cache;
use crate::cache::{AsKey, KeyList};
use crate::error::Result;
use crate::value::Value;

/// Borrowed view of a [`Cache`] obtained from [`Cache::legacy_callbacks`].
#[derive(Debug, Clone, Copy)]
pub struct LegacyCallbacks<'a> {
    cache: &'a Cache,
}

impl<'a> LegacyCallbacks<'a> {
    pub(crate) fn new(cache: &'a Cache) -> Self {
        Self { cache }
    }

    pub fn get<K: AsKey>(&self, key: K, callback: impl FnOnce(Result<Option<Value>>)) {
        callback(self.cache.get(key))
    }

    pub fn mget<L: KeyList>(&self, keys: L, callback: impl FnOnce(Result<HashMap<String, Value>>)) {
        callback(self.cache.mget(keys))
    }

    pub fn set<K: AsKey>(
        &self,
        key: K,
        value: impl Into<Value>,
        ttl: Option<f64>,
        callback: impl FnOnce(Result<bool>),
    ) {
        callback(self.cache.set(key, value, ttl))
    }

    pub fn del<K: AsKey>(&self, key: K, callback: impl FnOnce(Result<usize>)) {
        callback(self.cache.del(key))
    }

    pub fn ttl<K: AsKey>(&self, key: K, ttl: Option<f64>, callback: impl FnOnce(Result<bool>)) {
        callback(self.cache.ttl(key, ttl))
    }

    pub fn get_ttl<K: AsKey>(&self, key: K, callback: impl FnOnce(Result<Option<i64>>)) {
        callback(self.cache.get_ttl(key))
    }

    pub fn keys(&self, callback: impl FnOnce(Result<Vec<String>>)) {
        callback(Ok(self.cache.keys()))
    }

    pub fn has<K: AsKey>(&self, key: K, callback: impl FnOnce(Result<bool>)) {
        callback(Ok(self.cache.has(key)))
    }
}
