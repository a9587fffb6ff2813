//! Cache keys for record store calls.

use sha2::{Digest, Sha256};

use crate::cache::QueryKey;

/// Query key types for record store calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreQueryKey {
  /// The whole record collection
  Collection,
  /// One record by identifier
  Record { id: String },
}

impl QueryKey for StoreQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::Collection => "collection".to_string(),
      Self::Record { id } => format!("record:{}", id.trim()),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    match self {
      Self::Collection => "all records".to_string(),
      Self::Record { id } => format!("record {}", id),
    }
  }
}
