use color_eyre::{eyre::eyre, Result};
use reqwest::RequestBuilder;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::StoreConfig;

use super::api_types::{collection_from_json, find_by_identifier, record_from_json};
use super::error::StoreError;
use super::schema::RecordSchema;
use super::types::Record;

/// HTTP client for the sheet-backed record store.
///
/// Every call is bounded by a timeout and never retried; callers decide
/// what to do with a failure.
#[derive(Clone)]
pub struct StoreClient {
  http: reqwest::Client,
  collection_url: Url,
  record_url: Option<Url>,
  submit_url: Url,
  record_param: String,
  fetch_timeout: Duration,
  submit_timeout: Duration,
  schema: Arc<RecordSchema>,
}

impl StoreClient {
  pub fn new(config: &StoreConfig, schema: Arc<RecordSchema>) -> Result<Self> {
    let parse = |label: &str, raw: &str| {
      Url::parse(raw).map_err(|e| eyre!("Invalid {} URL '{}': {}", label, raw, e))
    };

    let http = reqwest::Client::builder()
      .user_agent(concat!("oatrack/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      collection_url: parse("collection", &config.collection_url)?,
      record_url: config
        .record_url
        .as_deref()
        .map(|raw| parse("record", raw))
        .transpose()?,
      submit_url: parse("submit", config.submit_url())?,
      record_param: config.record_param.clone(),
      fetch_timeout: config.fetch_timeout(),
      submit_timeout: config.submit_timeout(),
      schema,
    })
  }

  pub fn schema(&self) -> &RecordSchema {
    &self.schema
  }

  /// Host of the store, for display
  pub fn host(&self) -> &str {
    self.collection_url.host_str().unwrap_or("")
  }

  /// Send a request and return the body of a 2xx response.
  async fn send(&self, request: RequestBuilder, timeout: Duration) -> Result<String, StoreError> {
    let response = request.timeout(timeout).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
      return Err(StoreError::Status {
        status: status.as_u16(),
        body,
      });
    }
    Ok(body)
  }

  /// Get every listable record, in store order
  #[instrument(skip(self))]
  pub async fn fetch_collection(&self) -> Result<Vec<Record>, StoreError> {
    let body = self
      .send(self.http.get(self.collection_url.clone()), self.fetch_timeout)
      .await?;
    let records = collection_from_json(&body, &self.schema)?;
    debug!(count = records.len(), "fetched record collection");
    Ok(records)
  }

  /// Get a single record by identifier
  #[instrument(skip(self))]
  pub async fn fetch_record(&self, id: &str) -> Result<Record, StoreError> {
    let Some(record_url) = &self.record_url else {
      // No single-record endpoint: scan the collection
      let records = self.fetch_collection().await?;
      return find_by_identifier(records, id, &self.schema);
    };

    let mut url = record_url.clone();
    url.query_pairs_mut().append_pair(&self.record_param, id);

    let body = self.send(self.http.get(url), self.fetch_timeout).await?;
    record_from_json(&body, id, &self.schema)
  }

  /// Write the full field set of one record.
  ///
  /// The body is form-urlencoded in field order. The store's reply text is
  /// returned verbatim.
  #[instrument(skip(self, record), fields(id = %self.schema.identifier(record)))]
  pub async fn submit_record(&self, record: &Record) -> Result<String, StoreError> {
    let form: Vec<(&str, &str)> = record.iter().collect();
    let reply = self
      .send(
        self.http.post(self.submit_url.clone()).form(&form),
        self.submit_timeout,
      )
      .await?;
    info!(fields = form.len(), "record submitted");
    Ok(reply)
  }
}
