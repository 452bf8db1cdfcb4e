//! Memo Cache demo
//!
//! Walks through memoization, change notifications, TTL expiry and
//! statistics on a single cache instance.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memo_cache::{Cache, Config, EventKind, Value};

/// Entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Memoize an expensive computation with `fetch_with`
/// 4. Let a short-lived entry expire and observe the notification
/// 5. Print statistics as JSON and stop the sweep
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memo_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().with_check_period(1.0);
    info!(
        "Configuration loaded: std_ttl={}s, check_period={}s, max_keys={}",
        config.std_ttl, config.check_period, config.max_keys
    );
    let cache = Cache::new(config);

    cache.subscribe(|event| {
        info!(event = event.name(), key = ?event.key(), "Cache notification");
    });
    cache.on(EventKind::Expired, |event| {
        info!(key = ?event.key(), value = ?event.value(), "Entry expired");
    });

    // Memoization: the producer only runs on the first call
    for round in 1..=3 {
        let value = cache
            .fetch_with("fib:30", None, || Value::from(fibonacci(30)))
            .context("memoized fetch failed")?;
        info!(round, ?value, "fib(30)");
    }

    cache
        .set("session", Value::new_object([("user", Value::from("demo"))]), Some(0.5))
        .context("failed to store session")?;
    info!(expires_at = ?cache.get_ttl("session")?, "Session stored");

    // Wait for the TTL to pass and the sweep to evict the entry
    tokio::time::sleep(Duration::from_millis(1500)).await;
    info!(present = cache.has("session"), "Session after expiry");

    let stats = cache.get_stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    info!("Hit rate: {:.2}", stats.hit_rate());

    cache.close();
    Ok(())
}

fn fibonacci(n: u32) -> u32 {
    match n {
        0 | 1 => n,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}
