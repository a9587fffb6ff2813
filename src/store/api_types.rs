//! Conversion from the raw JSON the sheet script returns into records.
//!
//! The script serializes cells as whatever type the sheet holds, so a row
//! can mix strings, numbers, booleans and nulls. Records only hold strings.

use serde_json::{Map, Value};
use tracing::debug;

use crate::progress::{format_date, normalize_date_text, serial_to_date};

use super::error::StoreError;
use super::schema::RecordSchema;
use super::types::Record;

/// Render one cell as the string a record stores.
pub fn cell_to_string(field: &str, value: &Value, schema: &RecordSchema) -> String {
  let is_date = schema.is_date_field(field);
  match value {
    Value::Null => String::new(),
    Value::String(s) if is_date => normalize_date_text(s),
    Value::String(s) => s.clone(),
    Value::Number(n) if is_date => n
      .as_f64()
      .and_then(serial_to_date)
      .map(format_date)
      .unwrap_or_else(|| n.to_string()),
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    // Nested values never come from a plain sheet row; keep their JSON text
    other => other.to_string(),
  }
}

pub fn record_from_object(object: &Map<String, Value>, schema: &RecordSchema) -> Record {
  object
    .iter()
    .map(|(field, value)| (field.clone(), cell_to_string(field, value, schema)))
    .collect()
}

/// Parse a collection body: a JSON array of row objects.
///
/// Rows without both an identifier and a display name are dropped.
pub fn collection_from_json(body: &str, schema: &RecordSchema) -> Result<Vec<Record>, StoreError> {
  let value: Value = serde_json::from_str(body)?;
  let rows = match value {
    Value::Array(rows) => rows,
    other => {
      return Err(StoreError::Parse(format!(
        "expected a JSON array of records, got {}",
        json_kind(&other)
      )))
    }
  };

  let total = rows.len();
  let records: Vec<Record> = rows
    .iter()
    .filter_map(Value::as_object)
    .map(|row| record_from_object(row, schema))
    .filter(|record| schema.is_listable(record))
    .collect();

  if records.len() != total {
    debug!(
      kept = records.len(),
      dropped = total - records.len(),
      "dropped rows without identifier or display name"
    );
  }

  Ok(records)
}

/// Parse a single-record body for `id`.
///
/// An empty body, `null`, `{}`, an object carrying an `error` key, or a
/// record for some other identifier all mean the record does not exist.
pub fn record_from_json(body: &str, id: &str, schema: &RecordSchema) -> Result<Record, StoreError> {
  if body.trim().is_empty() {
    return Err(StoreError::NotFound(id.to_string()));
  }

  let value: Value = serde_json::from_str(body)?;
  let record = match value {
    Value::Null => return Err(StoreError::NotFound(id.to_string())),
    Value::Object(ref object) if object.is_empty() || object.contains_key("error") => {
      return Err(StoreError::NotFound(id.to_string()))
    }
    Value::Object(ref object) => record_from_object(object, schema),
    // Some deployments wrap the match in an array
    Value::Array(ref rows) => {
      return find_by_identifier(
        rows
          .iter()
          .filter_map(Value::as_object)
          .map(|row| record_from_object(row, schema)),
        id,
        schema,
      )
    }
    other => {
      return Err(StoreError::Parse(format!(
        "expected a JSON object, got {}",
        json_kind(&other)
      )))
    }
  };

  find_by_identifier(std::iter::once(record), id, schema)
}

/// First record whose identifier equals `id`.
pub fn find_by_identifier(
  records: impl IntoIterator<Item = Record>,
  id: &str,
  schema: &RecordSchema,
) -> Result<Record, StoreError> {
  let id = id.trim();
  records
    .into_iter()
    .find(|record| schema.identifier(record) == id)
    .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
