//! Date handling for the plan/actual progress fields.
//!
//! The sheet hands dates back in several shapes: ISO dates, RFC 3339
//! timestamps, day-first dates typed by hand, and raw spreadsheet serial
//! numbers. Everything here accepts all of them.

use chrono::{DateTime, Days, Local, NaiveDate};

use crate::store::{FieldGroup, Record};

/// Day zero of spreadsheet serial dates.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial we treat as a date (year 2173); anything above is just a number.
const MAX_SERIAL: f64 = 100_000.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Progress of one stage, derived from its plan and actual dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
  /// Neither date set
  NotScheduled,
  /// Planned, not done yet
  Pending,
  /// Done on or before the plan date
  OnTime,
  /// Done after the plan date
  Late,
  /// Done without a plan date
  Unplanned,
  /// A date is present but unreadable
  Unknown,
}

impl ProgressStatus {
  pub fn label(&self) -> &'static str {
    match self {
      ProgressStatus::NotScheduled => "not scheduled",
      ProgressStatus::Pending => "pending",
      ProgressStatus::OnTime => "on time",
      ProgressStatus::Late => "late",
      ProgressStatus::Unplanned => "unplanned",
      ProgressStatus::Unknown => "unknown",
    }
  }
}

/// Convert a spreadsheet serial day number to a calendar date.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
  if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
    return None;
  }
  let (y, m, d) = SERIAL_EPOCH;
  NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.floor() as u64))
}

/// Parse any of the date shapes the sheet produces.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
  let text = text.trim();
  if text.is_empty() {
    return None;
  }

  if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
    return Some(ts.with_timezone(&Local).date_naive());
  }

  if let Some(date) = DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
  {
    return Some(date);
  }

  text.parse::<f64>().ok().and_then(serial_to_date)
}

/// Rewrite timestamp-shaped date text as a plain `YYYY-MM-DD` date.
///
/// Anything that is not a timestamp comes back unchanged, so hand-typed
/// values survive a round trip.
pub fn normalize_date_text(text: &str) -> String {
  match DateTime::parse_from_rfc3339(text.trim()) {
    Ok(ts) => format_date(ts.with_timezone(&Local).date_naive()),
    Err(_) => text.to_string(),
  }
}

pub fn format_date(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}

/// Derive a stage's status from its plan and actual values.
pub fn progress_status(plan: &str, actual: &str) -> ProgressStatus {
  let (plan, actual) = (plan.trim(), actual.trim());

  match (plan.is_empty(), actual.is_empty()) {
    (true, true) => ProgressStatus::NotScheduled,
    (false, true) => match parse_date(plan) {
      Some(_) => ProgressStatus::Pending,
      None => ProgressStatus::Unknown,
    },
    (true, false) => match parse_date(actual) {
      Some(_) => ProgressStatus::Unplanned,
      None => ProgressStatus::Unknown,
    },
    (false, false) => match (parse_date(plan), parse_date(actual)) {
      (Some(p), Some(a)) if a > p => ProgressStatus::Late,
      (Some(_), Some(_)) => ProgressStatus::OnTime,
      _ => ProgressStatus::Unknown,
    },
  }
}

pub fn group_status(record: &Record, group: &FieldGroup) -> ProgressStatus {
  progress_status(record.value(&group.plan), record.value(&group.actual))
}
