use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, server title and the view's shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, title: &str, shortcuts: &[ShortcutInfo]) {
  let mut spans = vec![
    Span::styled(" hrdesk ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    Span::raw(" "),
  ];
  spans.extend(shortcut_spans(shortcuts));

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Shortcuts in priority order - keys highlighted, descriptions dimmed
fn shortcut_spans(shortcuts: &[ShortcutInfo]) -> Vec<Span<'static>> {
  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);

  let mut spans = Vec::with_capacity(sorted.len() * 3);
  for shortcut in sorted {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }
  spans
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_shortcuts_sorted_by_priority() {
    let shortcuts = [
      ShortcutInfo::new("q", "back").with_priority(90),
      ShortcutInfo::new("/", "search").with_priority(10),
    ];
    let text: String = shortcut_spans(&shortcuts)
      .iter()
      .map(|s| s.content.as_ref())
      .collect();
    assert_eq!(text, "  </> search  <q> back");
  }
}
