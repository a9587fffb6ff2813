//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::storage::CacheStorage;
use super::traits::{CacheResult, QueryKey, Recoverable};

/// Cache layer that manages caching logic and network fetching.
///
/// Storage failures never fail a fetch: a broken read is a miss and a
/// broken write is logged and dropped.
///
/// Every write carries a generation taken when it was issued. A fetch that
/// lands after a newer write to the same key (a submit, or a later fetch)
/// leaves that entry alone.
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  /// How long a cached entry may be shown before the network answers
  freshness: Duration,
  next_generation: Arc<AtomicU64>,
  /// Generation of the last write per cache key
  written: Arc<Mutex<HashMap<String, u64>>>,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      storage,
      freshness: Duration::minutes(5),
      next_generation: Arc::new(AtomicU64::new(0)),
      written: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Set the freshness window for cached data.
  pub fn with_freshness(mut self, freshness: Duration) -> Self {
    self.freshness = freshness;
    self
  }

  fn is_fresh(&self, cached_at: DateTime<Utc>) -> bool {
    Utc::now() - cached_at < self.freshness
  }

  /// Read and decode the entry for `key`, whatever its age.
  fn read<T, K>(&self, key: &K) -> Option<(T, DateTime<Utc>)>
  where
    T: DeserializeOwned,
    K: QueryKey,
  {
    let entry = match self.storage.get(&key.cache_hash()) {
      Ok(entry) => entry?,
      Err(e) => {
        warn!(key = %key.description(), error = %e, "cache read failed");
        return None;
      }
    };

    match serde_json::from_str(&entry.payload) {
      Ok(data) => Some((data, entry.cached_at)),
      Err(e) => {
        warn!(key = %key.description(), error = %e, "discarding undecodable cache entry");
        None
      }
    }
  }

  /// Cached data young enough to show while a fresh fetch runs.
  pub fn peek_fresh<T, K>(&self, key: &K) -> Option<CacheResult<T>>
  where
    T: DeserializeOwned,
    K: QueryKey,
  {
    let (data, cached_at) = self.read(key)?;
    if self.is_fresh(cached_at) {
      Some(CacheResult::from_cache(data, cached_at))
    } else {
      debug!(key = %key.description(), %cached_at, "cache entry past freshness window");
      None
    }
  }

  fn issue(&self) -> u64 {
    self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
  }

  /// Record `generation` as the latest write for `hash`, unless a newer one
  /// already landed.
  fn claim(&self, hash: &str, generation: u64) -> bool {
    let mut written = self.written.lock().unwrap_or_else(|e| e.into_inner());
    match written.get(hash) {
      Some(&latest) if latest > generation => false,
      _ => {
        written.insert(hash.to_string(), generation);
        true
      }
    }
  }

  /// Write `data` under `key` with the given timestamp, replacing whatever
  /// is there.
  pub fn store<T, K>(&self, key: &K, data: &T, cached_at: DateTime<Utc>)
  where
    T: Serialize,
    K: QueryKey,
  {
    let generation = self.issue();
    self.claim(&key.cache_hash(), generation);
    self.write(key, data, cached_at);
  }

  fn write<T, K>(&self, key: &K, data: &T, cached_at: DateTime<Utc>)
  where
    T: Serialize,
    K: QueryKey,
  {
    let payload = match serde_json::to_string(data) {
      Ok(payload) => payload,
      Err(e) => {
        warn!(key = %key.description(), error = %e, "failed to serialize cache entry");
        return;
      }
    };

    if let Err(e) = self.storage.put(&key.cache_hash(), &payload, cached_at) {
      warn!(key = %key.description(), error = %e, "cache write failed");
    }
  }

  /// Fetch from the network, falling back to the cache on failure.
  ///
  /// 1. Always run the fetcher
  /// 2. On success, write the result to the cache and return it, unless the
  ///    entry was rewritten (e.g. by a submit) after this fetch was issued
  /// 3. On a recoverable failure, return the cached entry of any age with a warning
  /// 4. Otherwise surface the error
  pub async fn fetch<T, E, K, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>, E>
  where
    T: Serialize + DeserializeOwned,
    E: Recoverable,
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let generation = self.issue();
    match fetcher().await {
      Ok(data) => {
        if self.claim(&key.cache_hash(), generation) {
          self.write(key, &data, Utc::now());
        } else {
          debug!(key = %key.description(), "cache rewritten since fetch was issued, keeping it");
        }
        Ok(CacheResult::from_network(data))
      }
      Err(err) if err.is_recoverable() => match self.read(key) {
        Some((data, cached_at)) => {
          warn!(key = %key.description(), error = %err, %cached_at, "fetch failed, serving cache");
          Ok(CacheResult::offline(data, cached_at, &err))
        }
        None => Err(err),
      },
      Err(err) => Err(err),
    }
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      freshness: self.freshness,
      next_generation: Arc::clone(&self.next_generation),
      written: Arc::clone(&self.written),
    }
  }
}
