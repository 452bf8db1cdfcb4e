//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - Expiration sweep: evicts expired cache entries at the configured period

mod sweep;

pub(crate) use sweep::spawn_sweep_task;
