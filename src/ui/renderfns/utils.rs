use crate::api::types::EmployeeStatus;
use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the display color for an employment status
pub fn status_color(status: EmployeeStatus) -> Color {
  match status {
    EmployeeStatus::Active => Color::Green,
    EmployeeStatus::OnLeave => Color::Yellow,
    EmployeeStatus::Terminated => Color::DarkGray,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("Zoë Ångström", 7), "Zoë ...");
  }

  #[test]
  fn test_status_color() {
    assert_eq!(status_color(EmployeeStatus::Active), Color::Green);
    assert_eq!(status_color(EmployeeStatus::OnLeave), Color::Yellow);
    assert_eq!(status_color(EmployeeStatus::Terminated), Color::DarkGray);
  }
}
