//! Integration Tests for the Cache Handle
//!
//! Exercises the public API end to end: notifications, expiration, flushing,
//! clone isolation and the legacy adapter.

use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use memo_cache::value::Deferred;
use memo_cache::{BatchEntry, Cache, CacheError, CacheEvent, Config, EventKind, Value};

// == Helper Functions ==

fn create_test_cache() -> Cache {
    Cache::new(Config::default().with_check_period(0.0))
}

fn record_events(cache: &Cache) -> Arc<Mutex<Vec<(String, Option<String>)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    cache.subscribe(move |event: &CacheEvent| {
        sink.lock()
            .unwrap()
            .push((event.name().to_string(), event.key().map(str::to_string)));
    });
    seen
}

fn names(seen: &Arc<Mutex<Vec<(String, Option<String>)>>>) -> Vec<String> {
    seen.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
}

// == Core Operations ==

#[test]
fn test_set_get_round_trip() {
    let cache = create_test_cache();
    let value = Value::new_object([
        ("name", Value::from("memo")),
        ("tags", Value::new_array(vec![Value::from("a"), Value::from("b")])),
    ]);

    assert!(cache.set("k", value.clone(), None).unwrap());
    assert_eq!(cache.get("k").unwrap(), Some(value));
    assert_eq!(cache.get("missing").unwrap(), None);

    let stats = cache.get_stats();
    assert_eq!((stats.hits, stats.misses, stats.keys), (1, 1, 1));
    assert_eq!(stats.ksize, 1);
    assert_eq!(stats.vsize, 160);
}

#[test]
fn test_batch_operations() {
    let cache = create_test_cache();
    cache
        .mset(&[
            BatchEntry::new("a", 1),
            BatchEntry::new("b", 2),
            BatchEntry::new("c", 3).with_ttl(60),
        ])
        .unwrap();

    let found = cache.mget(["a", "c", "z"]).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found["c"], Value::from(3));

    assert_eq!(cache.del_many(["a", "b", "z"]).unwrap(), 2);
    assert_eq!(cache.keys(), vec!["c".to_string()]);
}

#[test]
fn test_take_removes_value() {
    let cache = create_test_cache();
    cache.set(7, "seven", None).unwrap();

    assert_eq!(cache.take("7").unwrap(), Some(Value::from("seven")));
    assert!(!cache.has(7));
    assert_eq!(cache.take(7).unwrap(), None);
}

#[test]
fn test_error_codes_and_messages() {
    let cache = Cache::new(Config::default().with_max_keys(1).with_check_period(0.0));
    cache.set("a", 1, None).unwrap();

    let full = cache.set("b", 2, None).unwrap_err();
    assert_eq!(full.code(), "ECACHEFULL");
    assert_eq!(full.to_string(), "Cache max keys amount exceeded");

    let keys = cache.mget(Value::from("a")).unwrap_err();
    assert_eq!(keys, CacheError::KeysType);
    assert_eq!(keys.code(), "EKEYSTYPE");

    // the cap is checked before the batch itself is validated
    let batch = cache
        .mset(&[BatchEntry::new("a", 1).with_ttl("later")])
        .unwrap_err();
    assert_eq!(batch.code(), "ECACHEFULL");

    let unbounded = create_test_cache();
    let ttl = unbounded
        .mset(&[BatchEntry::new("a", 1).with_ttl("later")])
        .unwrap_err();
    assert_eq!(ttl.code(), "ETTLTYPE");
}

// == Notifications ==

#[test]
fn test_notification_sequence() {
    let cache = create_test_cache();
    let seen = record_events(&cache);

    cache.set("k", 1, None).unwrap();
    cache.del("k").unwrap();
    cache.flush_stats();
    cache.flush_all(false);

    assert_eq!(names(&seen), vec!["set", "del", "flush_stats", "flush"]);
    assert_eq!(seen.lock().unwrap()[0].1.as_deref(), Some("k"));
}

#[test]
fn test_expired_notification_carries_value() {
    let cache = create_test_cache();
    let expired = Arc::new(Mutex::new(Vec::new()));
    let sink = expired.clone();
    cache.on(EventKind::Expired, move |event| {
        sink.lock().unwrap().push(event.value().cloned());
    });

    cache.set("k", "v", Some(0.05)).unwrap();
    sleep(Duration::from_millis(100));
    assert_eq!(cache.get("k").unwrap(), None);

    assert_eq!(*expired.lock().unwrap(), vec![Some(Value::from("v"))]);
}

#[test]
fn test_listener_can_reenter_cache() {
    let cache = create_test_cache();
    let handle = cache.clone();
    cache.on(EventKind::Set, move |event| {
        if event.key() == Some("source") {
            handle.set("mirror", event.value().cloned(), None).unwrap();
        }
    });

    cache.set("source", 42, None).unwrap();
    assert_eq!(cache.get("mirror").unwrap(), Some(Value::from(42)));
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let cache = create_test_cache();
    let count = Arc::new(Mutex::new(0));
    let sink = count.clone();
    let id = cache.subscribe(move |_| *sink.lock().unwrap() += 1);

    cache.set("a", 1, None).unwrap();
    assert!(cache.unsubscribe(id));
    cache.set("b", 2, None).unwrap();

    assert_eq!(*count.lock().unwrap(), 1);
}

// == Expiration ==

#[test]
fn test_ttl_window() {
    let cache = create_test_cache();
    cache.set("k", "v", Some(0.3)).unwrap();

    sleep(Duration::from_millis(150));
    assert!(cache.has("k"));
    sleep(Duration::from_millis(250));
    assert!(!cache.has("k"));
}

#[test]
fn test_std_ttl_applies_by_default() {
    let cache = Cache::new(Config::default().with_std_ttl(0.05).with_check_period(0.0));
    cache.set("k", "v", None).unwrap();
    cache.set("pinned", "v", Some(0.0)).unwrap();

    sleep(Duration::from_millis(100));
    assert_eq!(cache.check_expired(), 1);
    assert_eq!(cache.keys(), vec!["pinned".to_string()]);
}

#[test]
fn test_keep_expired_entries() {
    let cache = Cache::new(
        Config::default()
            .with_delete_on_expire(false)
            .with_check_period(0.0),
    );
    let seen = record_events(&cache);
    cache.set("k", "v", Some(0.05)).unwrap();

    sleep(Duration::from_millis(100));
    assert_eq!(cache.get("k").unwrap(), None);
    assert_eq!(cache.get("k").unwrap(), None);

    assert_eq!(cache.keys(), vec!["k".to_string()]);
    assert_eq!(names(&seen), vec!["set", "expired", "expired"]);
}

#[tokio::test]
async fn test_periodic_sweep_evicts() {
    let cache = Cache::new(Config::default().with_check_period(0.1));
    let seen = record_events(&cache);
    cache.set("k", "v", Some(0.05)).unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(cache.keys().is_empty());
    assert_eq!(names(&seen), vec!["set", "del", "expired"]);
    cache.close();
}

#[tokio::test]
async fn test_flush_all_restarts_sweep() {
    let cache = Cache::new(Config::default().with_check_period(60.0));
    cache.set("k", "v", None).unwrap();

    cache.flush_all(true);
    assert!(cache.keys().is_empty());
    assert!(cache.is_sweeping());

    cache.close();
    assert!(!cache.is_sweeping());
}

// == Cloning ==

#[test]
fn test_clone_isolation() {
    let cache = create_test_cache();
    let original = Value::new_object([("count", Value::from(1))]);
    original.set_property("self", original.clone());

    cache.set("obj", original.clone(), None).unwrap();
    original.set_property("count", Value::from(99));

    let stored = cache.get("obj").unwrap().unwrap();
    assert_eq!(stored.get_property("count"), Value::from(1));
    assert!(stored.get_property("self").ptr_eq(&stored));
    assert!(!stored.ptr_eq(&original));
}

#[test]
fn test_shared_references_without_clones() {
    let cache = Cache::new(Config::default().with_use_clones(false).with_check_period(0.0));
    let list = Value::new_array(vec![Value::from(1)]);

    cache.set("list", list.clone(), None).unwrap();
    list.push(Value::from(2));

    let stored = cache.get("list").unwrap().unwrap();
    assert!(stored.ptr_eq(&list));
    assert_eq!(stored.index(1), Value::from(2));
}

#[tokio::test]
async fn test_deferred_values_settle_through_clones() {
    let cache = create_test_cache();
    let pending = Deferred::new();
    cache.set("job", pending.clone(), None).unwrap();

    let copy = cache.get("job").unwrap().unwrap();
    let copy = copy.as_deferred().unwrap().clone();
    assert!(!copy.ptr_eq(&pending));

    pending.resolve(Value::from("done"));
    assert_eq!(copy.settled().await, Ok(Value::from("done")));
}

#[test]
fn test_force_string_storage() {
    let cache = Cache::new(Config::default().with_force_string(true).with_check_period(0.0));
    cache
        .set("obj", Value::new_object([("hello", Value::from("World"))]), None)
        .unwrap();
    cache.set("nothing", Value::Null, None).unwrap();

    assert_eq!(cache.get("obj").unwrap(), Some(Value::from(r#"{"hello":"World"}"#)));
    assert_eq!(cache.get("nothing").unwrap(), Some(Value::from("null")));
    assert_eq!(cache.get_stats().vsize, 17 + 4);
}

// == Legacy Adapter ==

#[test]
fn test_legacy_adapter_round_trip() {
    let cache = Cache::new(
        Config::default()
            .with_legacy_callbacks(true)
            .with_check_period(0.0),
    );
    let legacy = cache.legacy_callbacks().expect("adapter enabled");

    let mut results = Vec::new();
    legacy.set("k", 5, None, |res| results.push(format!("{:?}", res)));
    legacy.get("k", |res| results.push(format!("{:?}", res.map(|v| v.is_some()))));
    legacy.get(true, |res| {
        results.push(res.unwrap_err().code().to_string());
    });

    assert_eq!(results, vec!["Ok(true)", "Ok(true)", "EKEYTYPE"]);
}
