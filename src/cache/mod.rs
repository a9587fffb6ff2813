//! Generic caching layer for data persistence and offline support.
//!
//! This module provides a store-agnostic caching mechanism that:
//! - Keeps one serialized payload per key with the time it was written
//! - Shows entries inside a freshness window while a fresh fetch runs
//! - Provides basic offline mode (serve stale cache when network unavailable)

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, MemoryStorage, NoopStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource, QueryKey, Recoverable};
