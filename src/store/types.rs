use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One row of the sheet.
///
/// Fields keep the order the store sent them in; that order is what the
/// editor shows and what a submit writes back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
  fields: IndexMap<String, String>,
}

impl Record {
  /// A record with every template field present and empty.
  pub fn blank<S: AsRef<str>>(template: &[S]) -> Self {
    template
      .iter()
      .map(|field| (field.as_ref().to_string(), String::new()))
      .collect()
  }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.fields.get(field).map(String::as_str)
  }

  /// Value of a field, or "" when the field is absent.
  pub fn value(&self, field: &str) -> &str {
    self.get(field).unwrap_or("")
  }

  /// Set a field, keeping its position if it already exists.
  pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
    self.fields.insert(field.into(), value.into());
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .fields
      .iter()
      .map(|(field, value)| (field.as_str(), value.as_str()))
  }

  pub fn field_names(&self) -> impl Iterator<Item = &str> {
    self.fields.keys().map(String::as_str)
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self {
      fields: iter
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    }
  }
}

/// A plan/actual pair of date fields for one production stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroup {
  pub plan: String,
  pub actual: String,
}

impl FieldGroup {
  pub fn new(stage: &str) -> Self {
    Self {
      plan: format!("{} PLAN", stage),
      actual: format!("{} ACTUAL", stage),
    }
  }

  pub fn contains(&self, field: &str) -> bool {
    self.plan == field || self.actual == field
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pairs(record: &Record) -> Vec<(&str, &str)> {
    record.iter().collect()
  }

  #[test]
  fn test_set_keeps_position() {
    let mut record: Record = [("A", "1"), ("B", "2"), ("C", "3")].into_iter().collect();
    record.set("B", "changed");
    record.set("D", "4");

    assert_eq!(
      pairs(&record),
      vec![("A", "1"), ("B", "changed"), ("C", "3"), ("D", "4")]
    );
  }

  #[test]
  fn test_blank_from_template() {
    let record = Record::blank(&["OA NUMBER", "REMARK"]);
    assert_eq!(pairs(&record), vec![("OA NUMBER", ""), ("REMARK", "")]);
  }

  #[test]
  fn test_value_of_missing_field_is_empty() {
    let record = Record::default();
    assert_eq!(record.get("REMARK"), None);
    assert_eq!(record.value("REMARK"), "");
  }

  #[test]
  fn test_json_keeps_field_order() {
    let json = r#"{"ZETA":"1","ALPHA":"2","MID":"3"}"#;
    let record: Record = serde_json::from_str(json).unwrap();
    assert_eq!(
      record.field_names().collect::<Vec<_>>(),
      vec!["ZETA", "ALPHA", "MID"]
    );
    assert_eq!(serde_json::to_string(&record).unwrap(), json);
  }

  #[test]
  fn test_field_group_names() {
    let group = FieldGroup::new("FINAL PAINTING");
    assert_eq!(group.plan, "FINAL PAINTING PLAN");
    assert_eq!(group.actual, "FINAL PAINTING ACTUAL");
    assert!(group.contains("FINAL PAINTING ACTUAL"));
    assert!(!group.contains("HYDRO PLAN"));
  }
}
