//! Access to the sheet-backed record store.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod error;
pub mod schema;
pub mod types;

pub use cached_client::CachedStore;
pub use client::StoreClient;
pub use schema::RecordSchema;
pub use types::{FieldGroup, Record};
