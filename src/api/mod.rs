//! API Module
//!
//! The public cache handle and its callback-style adapter.
//!
//! # Operations
//! - `set` / `mset` - Store values with optional TTL
//! - `get` / `mget` / `take` / `fetch` - Read values
//! - `del` / `del_many` - Remove keys
//! - `ttl` / `get_ttl` - Inspect and reassign expiry
//! - `get_stats` / `flush_all` / `flush_stats` - Statistics and maintenance

mod cache;
mod legacy;

pub(crate) use cache::CacheInner;
pub use cache::Cache;
pub use legacy::LegacyCallbacks;
