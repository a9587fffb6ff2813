use crate::config::RecordsConfig;

use super::types::{FieldGroup, Record};

/// Which fields identify, name, and group a record.
#[derive(Debug, Clone)]
pub struct RecordSchema {
  pub identifier_field: String,
  pub display_field: String,
  read_only: Vec<String>,
  groups: Vec<FieldGroup>,
  extra_fields: Vec<String>,
}

impl RecordSchema {
  pub fn from_config(config: &RecordsConfig) -> Self {
    Self {
      identifier_field: config.identifier_field.clone(),
      display_field: config.display_field.clone(),
      read_only: config.read_only_fields.clone(),
      groups: config
        .field_groups
        .iter()
        .map(|stage| FieldGroup::new(stage))
        .collect(),
      extra_fields: config.extra_fields.clone(),
    }
  }

  pub fn identifier<'a>(&self, record: &'a Record) -> &'a str {
    record.value(&self.identifier_field).trim()
  }

  pub fn display_name<'a>(&self, record: &'a Record) -> &'a str {
    record.value(&self.display_field).trim()
  }

  /// A record is listable when both its identifier and its display name are set.
  pub fn is_listable(&self, record: &Record) -> bool {
    !self.identifier(record).is_empty() && !self.display_name(record).is_empty()
  }

  pub fn is_read_only(&self, field: &str) -> bool {
    self.read_only.iter().any(|f| f == field)
  }

  pub fn group_for(&self, field: &str) -> Option<&FieldGroup> {
    self.groups.iter().find(|g| g.contains(field))
  }

  /// Fields holding dates: every plan/actual field plus anything named like a date.
  pub fn is_date_field(&self, field: &str) -> bool {
    if self.group_for(field).is_some() {
      return true;
    }
    let upper = field.to_uppercase();
    upper.contains("DATE") || upper.ends_with(".DT") || upper.ends_with(" DT")
  }

  /// Field names of a blank record, in display order.
  pub fn template(&self) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    let mut push = |field: &str| {
      if !fields.iter().any(|f| f == field) {
        fields.push(field.to_string());
      }
    };

    push(&self.display_field);
    push(&self.identifier_field);
    for field in &self.read_only {
      push(field);
    }
    for group in &self.groups {
      push(&group.plan);
      push(&group.actual);
    }
    for field in &self.extra_fields {
      push(field);
    }
    fields
  }
}
