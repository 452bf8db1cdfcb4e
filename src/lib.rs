//! Memo Cache - An in-process key/value cache
//!
//! Provides per-entry TTL expiration, hit/miss and size statistics, deep-clone
//! isolation of stored values and change notifications.

pub mod api;
pub mod cache;
pub mod clone;
pub mod config;
pub mod error;
pub mod events;
mod tasks;
pub mod value;

pub use api::{Cache, LegacyCallbacks};
pub use cache::{AsKey, BatchEntry, CacheStats, Key, KeyList};
pub use clone::{clone_prototype, deep_clone, deep_clone_with, CloneOptions};
pub use config::Config;
pub use error::{CacheError, Result};
pub use events::{CacheEvent, EventKind, SubscriptionId};
pub use value::Value;
