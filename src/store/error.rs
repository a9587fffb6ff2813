use thiserror::Error;

use crate::cache::Recoverable;

/// Errors from talking to the record store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
  /// The request did not complete within its time bound
  #[error("Request timed out")]
  Timeout,

  /// Connection, TLS, or body transfer failure
  #[error("Network error: {0}")]
  Transport(String),

  /// The store answered with a non-success status
  #[error("Store returned HTTP {status}: {body}")]
  Status { status: u16, body: String },

  /// The body was not the JSON shape we expect
  #[error("Malformed response: {0}")]
  Parse(String),

  /// No record carries the requested identifier
  #[error("No record found for {0}")]
  NotFound(String),
}

impl StoreError {
  /// Timeout, transport, and status failures.
  pub fn is_network(&self) -> bool {
    matches!(
      self,
      StoreError::Timeout | StoreError::Transport(_) | StoreError::Status { .. }
    )
  }
}

impl Recoverable for StoreError {
  fn is_recoverable(&self) -> bool {
    self.is_network() || matches!(self, StoreError::Parse(_))
  }
}

impl From<reqwest::Error> for StoreError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      StoreError::Timeout
    } else if let Some(status) = err.status() {
      StoreError::Status {
        status: status.as_u16(),
        body: String::new(),
      }
    } else {
      StoreError::Transport(err.to_string())
    }
  }
}

impl From<serde_json::Error> for StoreError {
  fn from(err: serde_json::Error) -> Self {
    StoreError::Parse(err.to_string())
  }
}
