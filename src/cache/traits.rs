//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};

/// A key that names one cached payload.
pub trait QueryKey {
  /// Stable, fixed-length storage key
  fn cache_hash(&self) -> String;

  /// Human-readable form for logs
  fn description(&self) -> String;
}

/// Errors that may be answered from the cache instead of surfacing.
pub trait Recoverable: std::error::Error {
  /// Whether serving the last cached copy is an acceptable answer to this error.
  fn is_recoverable(&self) -> bool {
    true
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
  /// Non-fatal problem to show next to the data
  pub warning: Option<String>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
      warning: None,
    }
  }

  /// Create a new cache result from a cache entry still inside the freshness window.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at: Some(cached_at),
      warning: None,
    }
  }

  /// Create a new cache result for offline mode.
  pub fn offline(data: T, cached_at: DateTime<Utc>, reason: impl std::fmt::Display) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
      warning: Some(format!("Using cached data: {}", reason)),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still inside the freshness window
  CacheFresh,
  /// Network failed, serving cached data of any age
  Offline,
}
