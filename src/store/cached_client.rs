//! Cached record store that wraps StoreClient with transparent caching.

use chrono::Utc;
use tracing::info;

use crate::cache::{CacheLayer, CacheResult};

use super::cache::StoreQueryKey;
use super::client::StoreClient;
use super::error::StoreError;
use super::schema::RecordSchema;
use super::types::Record;

/// Record store with transparent caching support.
///
/// Reads fall back to the last cached copy when the network fails; a
/// successful submit overwrites the cached copy of that record with what was
/// sent, without reading it back.
#[derive(Clone)]
pub struct CachedStore {
  inner: StoreClient,
  cache: CacheLayer,
}

impl CachedStore {
  pub fn new(inner: StoreClient, cache: CacheLayer) -> Self {
    Self { inner, cache }
  }

  pub fn schema(&self) -> &RecordSchema {
    self.inner.schema()
  }

  pub fn host(&self) -> &str {
    self.inner.host()
  }

  /// The cached collection, if it is young enough to show right away.
  pub fn cached_collection(&self) -> Option<CacheResult<Vec<Record>>> {
    self.cache.peek_fresh(&StoreQueryKey::Collection)
  }

  /// Fetch the collection, serving the cache if the network fails.
  pub async fn load_collection(&self) -> Result<CacheResult<Vec<Record>>, StoreError> {
    self
      .cache
      .fetch(&StoreQueryKey::Collection, || {
        let inner = self.inner.clone();
        async move { inner.fetch_collection().await }
      })
      .await
  }

  /// The cached record, if it is young enough to show right away.
  pub fn cached_record(&self, id: &str) -> Option<CacheResult<Record>> {
    self.cache.peek_fresh(&record_key(id))
  }

  /// Fetch one record, serving the cache if the network fails.
  pub async fn load_record(&self, id: &str) -> Result<CacheResult<Record>, StoreError> {
    self
      .cache
      .fetch(&record_key(id), || {
        let inner = self.inner.clone();
        let id = id.to_string();
        async move { inner.fetch_record(&id).await }
      })
      .await
  }

  /// Submit a record and, on success, cache exactly what was sent.
  pub async fn submit(&self, record: &Record) -> Result<String, StoreError> {
    let reply = self.inner.submit_record(record).await?;

    let id = self.schema().identifier(record);
    if !id.is_empty() {
      self.cache.store(&record_key(id), record, Utc::now());
      info!(id, "cached submitted record");
    }

    Ok(reply)
  }
}

fn record_key(id: &str) -> StoreQueryKey {
  StoreQueryKey::Record { id: id.to_string() }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::cache::{CacheSource, MemoryStorage};
  use crate::config::{RecordsConfig, StoreConfig};
  use chrono::Duration;
  use std::sync::Arc;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  pub(crate) fn store_for(server_uri: &str) -> CachedStore {
    let config = StoreConfig {
      collection_url: format!("{}/read", server_uri),
      record_url: Some(format!("{}/one", server_uri)),
      submit_url: Some(format!("{}/write", server_uri)),
      record_param: "oaNumber".to_string(),
      fetch_timeout_secs: 2,
      submit_timeout_secs: 2,
    };
    let schema = Arc::new(RecordSchema::from_config(&RecordsConfig::default()));
    let client = StoreClient::new(&config, schema).unwrap();
    CachedStore::new(client, CacheLayer::new(Arc::new(MemoryStorage::default())))
  }

  /// Put `record` in the cache as if it had just been fetched
  pub(crate) fn seed_record(store: &CachedStore, record: &Record) {
    let id = store.schema().identifier(record).to_string();
    store.cache.store(&record_key(&id), record, Utc::now());
  }

  fn pairs(record: &Record) -> Vec<(String, String)> {
    record
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  const COLLECTION: &str = r#"[{"CUSTOMER NAME":"Acme","OA NUMBER":"101","REMARK":"x"},{"CUSTOMER NAME":"Zeta","OA NUMBER":"202"}]"#;

  #[tokio::test]
  async fn test_collection_cache_round_trip_keeps_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/read"))
      .respond_with(ResponseTemplate::new(200).set_body_string(COLLECTION))
      .mount(&server)
      .await;

    let store = store_for(&server.uri());
    assert!(store.cached_collection().is_none());

    let fresh = store.load_collection().await.unwrap();
    assert_eq!(fresh.source, CacheSource::Network);

    let cached = store.cached_collection().unwrap();
    assert_eq!(cached.source, CacheSource::CacheFresh);
    assert_eq!(cached.data, fresh.data);
    for (a, b) in cached.data.iter().zip(&fresh.data) {
      assert_eq!(pairs(a), pairs(b));
    }
  }

  #[tokio::test]
  async fn test_collection_falls_back_to_stale_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/read"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let store = store_for(&server.uri());
    let cached: Vec<Record> = vec![[("CUSTOMER NAME", "Acme"), ("OA NUMBER", "101")]
      .into_iter()
      .collect()];
    store.cache.store(
      &StoreQueryKey::Collection,
      &cached,
      Utc::now() - Duration::hours(2),
    );

    assert!(store.cached_collection().is_none());

    let result = store.load_collection().await.unwrap();
    assert_eq!(result.source, CacheSource::Offline);
    assert_eq!(result.data, cached);
    assert!(result.warning.unwrap().contains("HTTP 500"));
  }

  #[tokio::test]
  async fn test_collection_failure_without_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/read"))
      .respond_with(ResponseTemplate::new(502))
      .mount(&server)
      .await;

    let err = store_for(&server.uri()).load_collection().await.unwrap_err();
    assert!(err.is_network());
  }

  #[tokio::test]
  async fn test_record_not_found_ignores_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/one"))
      .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
      .mount(&server)
      .await;

    let store = store_for(&server.uri());
    let stale: Record = [("OA NUMBER", "101")].into_iter().collect();
    store.cache.store(&record_key("101"), &stale, Utc::now());

    let err = store.load_record("101").await.unwrap_err();
    assert_eq!(err, StoreError::NotFound("101".to_string()));
  }

  #[tokio::test]
  async fn test_submit_updates_record_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/write"))
      .respond_with(ResponseTemplate::new(200).set_body_string("Updated 1 row"))
      .expect(1)
      .mount(&server)
      .await;

    let store = store_for(&server.uri());
    let record: Record = [("OA NUMBER", "101"), ("REMARK", "shipped")]
      .into_iter()
      .collect();

    let reply = store.submit(&record).await.unwrap();
    assert_eq!(reply, "Updated 1 row");

    // The cached copy is what was sent; the store is not read back
    let cached = store.cached_record("101").unwrap();
    assert_eq!(cached.data, record);
  }

  #[tokio::test]
  async fn test_read_in_flight_during_submit_keeps_submitted_copy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/one"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_string(r#"{"OA NUMBER":"101","REMARK":"old"}"#)
          .set_delay(std::time::Duration::from_millis(300)),
      )
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/write"))
      .respond_with(ResponseTemplate::new(200).set_body_string("Updated 1 row"))
      .mount(&server)
      .await;

    let store = store_for(&server.uri());
    let reader = store.clone();
    let read = tokio::spawn(async move { reader.load_record("101").await });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let record: Record = [("OA NUMBER", "101"), ("REMARK", "new")]
      .into_iter()
      .collect();
    store.submit(&record).await.unwrap();
    assert_eq!(store.cached_record("101").unwrap().data.value("REMARK"), "new");

    // The slow read still answers its caller but does not rewrite the cache
    let late = read.await.unwrap().unwrap();
    assert_eq!(late.data.value("REMARK"), "old");
    assert_eq!(store.cached_record("101").unwrap().data.value("REMARK"), "new");
  }

  #[tokio::test]
  async fn test_failed_submit_leaves_cache_alone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/write"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let store = store_for(&server.uri());
    let record: Record = [("OA NUMBER", "101")].into_iter().collect();

    assert!(store.submit(&record).await.is_err());
    assert!(store.cached_record("101").is_none());
  }
}
