use crate::progress::ProgressStatus;
use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a stage's progress
pub fn progress_color(status: ProgressStatus) -> Color {
  match status {
    ProgressStatus::Late => Color::Red,
    ProgressStatus::OnTime => Color::Green,
    ProgressStatus::Pending => Color::Yellow,
    _ => Color::White,
  }
}
