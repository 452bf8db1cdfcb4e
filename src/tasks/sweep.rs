//! Expiration Sweep Task
//!
//! Background task that periodically evicts expired cache entries.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::CacheInner;

/// Spawns a background task that periodically runs the expiration check.
///
/// The task only holds a weak reference, so it never keeps a cache alive;
/// it ends on its own once the last handle is dropped.
///
/// # Arguments
/// * `runtime` - Runtime to spawn onto
/// * `cache` - Weak reference to the cache state
/// * `interval` - Time between passes
///
/// # Returns
/// A JoinHandle for the spawned task, used to abort it on `close`,
/// `flush_all` or drop.
pub(crate) fn spawn_sweep_task(
    runtime: &Handle,
    cache: Weak<CacheInner>,
    interval: Duration,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        debug!(
            "Starting expiration sweep with interval of {:?}",
            interval
        );

        loop {
            tokio::time::sleep(interval).await;

            let Some(inner) = cache.upgrade() else {
                debug!("Cache dropped, stopping expiration sweep");
                break;
            };
            let expired = inner.check_expired();
            drop(inner);

            if expired > 0 {
                info!("Expiration sweep: {} expired entries", expired);
            } else {
                debug!("Expiration sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::{Cache, Config, Value};
    use std::time::Duration;

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let cache = Cache::new(Config::default().with_check_period(0.2));

        cache.set("expire_soon", "value", Some(0.1)).unwrap();

        // Wait for entry to expire and the sweep to run
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(cache.keys().is_empty(), "Expired entry should have been swept");
        assert_eq!(cache.get_stats().keys, 0);
        cache.close();
    }

    #[tokio::test]
    async fn test_sweep_preserves_valid_entries() {
        let cache = Cache::new(Config::default().with_check_period(0.2));

        cache.set("long_lived", "value", Some(3600.0)).unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(cache.keys(), vec!["long_lived".to_string()]);
        assert_eq!(cache.get("long_lived").unwrap(), Some(Value::from("value")));
        cache.close();
    }

    #[tokio::test]
    async fn test_sweep_can_be_aborted() {
        let cache = Cache::new(Config::default().with_check_period(1.0));
        cache.set("k", "v", Some(0.1)).unwrap();

        cache.close();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!cache.is_sweeping());
        // nothing swept the entry; it is still stored until touched
        assert_eq!(cache.keys().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_stops_when_cache_dropped() {
        let cache = Cache::new(Config::default().with_check_period(0.05));
        let weak = std::sync::Arc::downgrade(cache.shared_state());
        drop(cache);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(weak.upgrade().is_none());
    }
}
