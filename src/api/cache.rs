//! Cache Handle
//!
//! The thread-safe public face of a cache: a cheaply clonable handle around a
//! locked [`CacheStore`], a notification registry and the background
//! expiration sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::LegacyCallbacks;
use crate::cache::{AsKey, BatchEntry, CacheStats, CacheStore, KeyList};
use crate::config::Config;
use crate::error::Result;
use crate::events::{CacheEvent, EventKind, Notifier, SubscriptionId};
use crate::tasks::spawn_sweep_task;
use crate::value::Value;

// == Shared State ==
/// State shared by every handle of one cache.
pub(crate) struct CacheInner {
    /// The store; never held while listeners run
    store: Mutex<CacheStore>,
    notifier: Notifier,
    /// Running expiration sweep, if any
    sweep: Mutex<Option<JoinHandle<()>>>,
    config: Config,
}

impl CacheInner {
    /// Runs `op` under the store lock, then publishes the notifications it
    /// produced once the lock is released.
    fn with_store<T>(&self, op: impl FnOnce(&mut CacheStore) -> T) -> T {
        let (out, events) = {
            let mut store = self.store.lock();
            let out = op(&mut store);
            (out, store.take_events())
        };
        for event in &events {
            self.notifier.publish(event);
        }
        out
    }

    /// Evicts (or flags) every expired entry. Returns how many were found.
    pub(crate) fn check_expired(&self) -> usize {
        self.with_store(CacheStore::check_expired)
    }

    fn stop_sweep(&self) {
        if let Some(handle) = self.sweep.lock().take() {
            handle.abort();
            info!("Expiration sweep stopped");
        }
    }
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep.get_mut().take() {
            handle.abort();
        }
    }
}

// == Cache ==
/// In-process key/value cache with per-entry TTL.
///
/// Clones share the same entries, statistics, listeners and sweep.
///
/// # Example
/// ```ignore
/// let cache = Cache::new(Config::default().with_std_ttl(60.0));
/// cache.set("answer", 42, None)?;
/// assert_eq!(cache.get("answer")?, Some(Value::from(42)));
/// ```
#[derive(Clone)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

impl Cache {
    // == Constructor ==
    /// Creates a cache, runs an initial expiration check and starts the
    /// periodic sweep when `check_period` is positive.
    ///
    /// The sweep needs a tokio runtime; outside of one, entries still expire
    /// lazily on access.
    pub fn new(config: Config) -> Self {
        debug!(?config, "Creating cache");
        if config.enable_legacy_callbacks {
            warn!("Legacy callback support is enabled; prefer the direct API");
        }

        let cache = Self {
            inner: Arc::new(CacheInner {
                store: Mutex::new(CacheStore::new(config.clone())),
                notifier: Notifier::new(),
                sweep: Mutex::new(None),
                config,
            }),
        };
        cache.check_data(true);
        cache
    }

    /// The options this cache was built with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    // == Core Operations ==
    /// Stores `value` under `key`. Without `ttl` the default TTL applies.
    ///
    /// # Errors
    /// `ECACHEFULL`, `EKEYTYPE` or `ESERIALIZE`; nothing is written on error.
    pub fn set<K: AsKey>(&self, key: K, value: impl Into<Value>, ttl: Option<f64>) -> Result<bool> {
        let value = value.into();
        self.inner.with_store(|store| store.set(key, value, ttl))
    }

    /// Returns the live value for `key`, counting a hit or a miss.
    ///
    /// Containers are reference counted, so a cyclic value (and every deep
    /// copy of one handed out here) is never freed.
    pub fn get<K: AsKey>(&self, key: K) -> Result<Option<Value>> {
        self.inner.with_store(|store| store.get(key))
    }

    /// Returns the live values among `keys`; misses are simply absent.
    pub fn mget<L: KeyList>(&self, keys: L) -> Result<HashMap<String, Value>> {
        self.inner.with_store(|store| store.mget(keys))
    }

    /// Stores a validated batch of entries.
    pub fn mset(&self, batch: &[BatchEntry]) -> Result<bool> {
        self.inner.with_store(|store| store.mset(batch))
    }

    /// Deletes `key`. Returns the number of entries removed.
    pub fn del<K: AsKey>(&self, key: K) -> Result<usize> {
        self.inner.with_store(|store| store.del(key))
    }

    /// Deletes every key in `keys`. Returns the number of entries removed.
    pub fn del_many<L: KeyList>(&self, keys: L) -> Result<usize> {
        self.inner.with_store(|store| store.del_many(keys))
    }

    /// Returns the live value for `key` and deletes it.
    pub fn take<K: AsKey>(&self, key: K) -> Result<Option<Value>> {
        self.inner.with_store(|store| store.take(key))
    }

    /// Whether `key` holds a live entry. Does not touch the hit/miss counters.
    pub fn has<K: AsKey>(&self, key: K) -> bool {
        self.inner.with_store(|store| store.has(key))
    }

    // == Fetch ==
    /// Returns the live value for `key`, or stores and returns `value`.
    ///
    /// A function value is invoked with no arguments and its result stored
    /// instead.
    pub fn fetch<K: AsKey>(&self, key: K, ttl: Option<f64>, value: impl Into<Value>) -> Result<Value> {
        let value = value.into();
        self.fetch_with(key, ttl, move || match value {
            Value::Function(function) => function.call(&[]),
            other => other,
        })
    }

    /// Returns the live value for `key`, or computes, stores and returns one.
    ///
    /// `produce` runs without any lock held, so it may use the cache.
    pub fn fetch_with<K, F>(&self, key: K, ttl: Option<f64>, produce: F) -> Result<Value>
    where
        K: AsKey,
        F: FnOnce() -> Value,
    {
        if self.has(&key) {
            if let Some(value) = self.get(&key)? {
                return Ok(value);
            }
        }
        let value = produce();
        self.set(&key, value.clone(), ttl)?;
        Ok(value)
    }

    // == TTL ==
    /// Reassigns the TTL of a live key. A negative TTL deletes it.
    pub fn ttl<K: AsKey>(&self, key: K, ttl: Option<f64>) -> Result<bool> {
        self.inner.with_store(|store| store.ttl(key, ttl))
    }

    /// Absolute expiry of a live key in Unix milliseconds, `0` = never.
    pub fn get_ttl<K: AsKey>(&self, key: K) -> Result<Option<i64>> {
        self.inner.with_store(|store| store.get_ttl(key))
    }

    /// Every stored key, including expired ones not yet evicted.
    pub fn keys(&self) -> Vec<String> {
        self.inner.store.lock().keys()
    }

    /// Snapshot of the statistics.
    pub fn get_stats(&self) -> CacheStats {
        self.inner.store.lock().stats()
    }

    // == Maintenance ==
    /// Removes every entry, resets the statistics and stops the periodic
    /// sweep. With `restart_sweep` the sweep is started again from now.
    pub fn flush_all(&self, restart_sweep: bool) {
        self.inner.stop_sweep();
        let events = {
            let mut store = self.inner.store.lock();
            store.flush_all();
            store.take_events()
        };
        if restart_sweep {
            self.check_data(true);
        }
        for event in &events {
            self.inner.notifier.publish(event);
        }
    }

    /// Resets the statistics, keeping the entries.
    pub fn flush_stats(&self) {
        self.inner.with_store(CacheStore::flush_stats);
    }

    /// Runs one expiration pass now. Returns the number of expired entries found.
    pub fn check_expired(&self) -> usize {
        self.inner.check_expired()
    }

    /// Stops the periodic sweep. The cache stays usable.
    pub fn close(&self) {
        self.inner.stop_sweep();
    }

    /// Whether a periodic sweep is currently scheduled.
    pub fn is_sweeping(&self) -> bool {
        self.inner
            .sweep
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    // == Notifications ==
    /// Registers a listener for every notification.
    ///
    /// Listeners run synchronously on the mutating thread after the mutation
    /// completed, with no cache lock held.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.inner.notifier.subscribe(listener)
    }

    /// Registers a listener for one kind of notification.
    pub fn on<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if event.kind() == kind {
                listener(event);
            }
        })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.notifier.unsubscribe(id)
    }

    // == Legacy Callbacks ==
    /// The callback-style adapter, when `enable_legacy_callbacks` was set.
    pub fn legacy_callbacks(&self) -> Option<LegacyCallbacks<'_>> {
        self.inner
            .config
            .enable_legacy_callbacks
            .then(|| LegacyCallbacks::new(self))
    }

    #[cfg(test)]
    pub(crate) fn shared_state(&self) -> &Arc<CacheInner> {
        &self.inner
    }

    // == Sweep ==
    fn check_data(&self, start_period: bool) {
        self.inner.check_expired();
        if start_period && self.inner.config.check_period > 0.0 {
            self.start_sweep();
        }
    }

    fn start_sweep(&self) {
        let period = match Duration::try_from_secs_f64(self.inner.config.check_period) {
            Ok(period) => period,
            Err(err) => {
                warn!(check_period = self.inner.config.check_period, %err, "Invalid check period, sweep disabled");
                return;
            }
        };
        match Handle::try_current() {
            Ok(runtime) => {
                let handle = spawn_sweep_task(&runtime, Arc::downgrade(&self.inner), period);
                if let Some(previous) = self.inner.sweep.lock().replace(handle) {
                    previous.abort();
                }
                info!(period_secs = period.as_secs_f64(), "Expiration sweep scheduled");
            }
            Err(_) => {
                warn!("No tokio runtime available, expired entries are evicted on access only");
            }
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.inner.config)
            .field("keys", &self.inner.store.lock().len())
            .field("listeners", &self.inner.notifier.listener_count())
            .finish()
    }
}
