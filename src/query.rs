//! Async query abstraction for data fetching with caching support.
//!
//! Inspired by TanStack Query, this module provides a `Query<T>` type that
//! encapsulates async data fetching, loading states, and error handling.
//!
//! # Example
//!
//! ```ignore
//! let store = cached_store.clone();
//! let mut query = Query::new(move || {
//!     let store = store.clone();
//!     async move { store.load_collection().await.map_err(|e| e.to_string()) }
//! });
//!
//! // Show a young cache entry while the network answers
//! if let Some(cached) = cached_store.cached_collection() {
//!     query.prime(cached);
//! }
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```
//!
//! Every fetch is tagged with a sequence number. Only the response to the
//! latest fetch is applied; a slow response to an earlier one is dropped.

use futures::future::BoxFuture;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cache::{CacheResult, CacheSource};

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is fetching and has nothing to show yet
  Loading,
  /// Query has data (possibly being refreshed in the background)
  Success(T),
  /// Query failed with nothing to show
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type FetchResult<T> = Result<CacheResult<T>, String>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<'static, FetchResult<T>> + Send + Sync>;

/// Async query for data fetching with state management.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - Loading/success/error states plus a non-fatal warning
/// - Async result handling via a channel, discarding out-of-date responses
pub struct Query<T> {
  state: QueryState<T>,
  source: Option<CacheSource>,
  warning: Option<String>,
  fetcher: FetcherFn<T>,
  sender: mpsc::UnboundedSender<(u64, FetchResult<T>)>,
  receiver: mpsc::UnboundedReceiver<(u64, FetchResult<T>)>,
  /// Sequence number of the latest fetch issued
  seq: u64,
  in_flight: bool,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult<T>> + Send + 'static,
  {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      state: QueryState::Idle,
      source: None,
      warning: None,
      fetcher: Box::new(move || Box::pin(fetcher())),
      sender,
      receiver,
      seq: 0,
      in_flight: false,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query has any.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// Check if the query is loading with nothing to show.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if data is shown while a fetch is still running.
  pub fn is_refreshing(&self) -> bool {
    self.in_flight && self.state.is_success()
  }

  /// Check if the query failed.
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Non-fatal problem with the shown data, e.g. served from cache after a failure.
  pub fn warning(&self) -> Option<&str> {
    self.warning.as_deref()
  }

  /// Where the shown data came from.
  pub fn source(&self) -> Option<CacheSource> {
    self.source
  }

  /// Show data before any fetch completes (a young cache entry).
  pub fn prime(&mut self, cached: CacheResult<T>) {
    self.source = Some(cached.source);
    self.warning = cached.warning;
    self.state = QueryState::Success(cached.data);
  }

  /// Start fetching data if no fetch is running.
  pub fn fetch(&mut self) {
    if self.in_flight {
      return;
    }
    self.start_fetch();
  }

  /// Force a new fetch; any response to an earlier fetch will be ignored.
  pub fn refetch(&mut self) {
    self.start_fetch();
  }

  /// Poll for results from pending fetches.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    while let Ok((seq, result)) = self.receiver.try_recv() {
      if seq != self.seq {
        debug!(seq, latest = self.seq, "discarding out-of-date response");
        continue;
      }

      self.in_flight = false;
      match result {
        Ok(loaded) => {
          self.source = Some(loaded.source);
          self.warning = loaded.warning;
          self.state = QueryState::Success(loaded.data);
        }
        Err(error) => {
          self.source = None;
          self.warning = None;
          self.state = QueryState::Error(error);
        }
      }
      changed = true;
    }

    changed
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    self.seq += 1;
    self.in_flight = true;
    // Keep showing data we already have
    if !self.state.is_success() {
      self.state = QueryState::Loading;
    }

    let seq = self.seq;
    let tx = self.sender.clone();
    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - the query may have been dropped
      let _ = tx.send((seq, result));
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("source", &self.source)
      .field("warning", &self.warning)
      .field("seq", &self.seq)
      .field("in_flight", &self.in_flight)
      .finish_non_exhaustive()
  }
}
