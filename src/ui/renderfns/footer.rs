use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer: the navigation path on the left and the current view's
/// status on the right.
pub fn draw_footer(frame: &mut Frame, area: Rect, path: &[String], status: Option<&str>) {
  let status = status.map(|s| format!("{} ", s)).unwrap_or_default();
  let [path_area, status_area] = Layout::horizontal([
    Constraint::Min(0),
    Constraint::Length(status.chars().count() as u16),
  ])
  .areas(area);

  let background = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(path_line(path)).style(background), path_area);
  frame.render_widget(
    Paragraph::new(status)
      .style(background.fg(Color::DarkGray))
      .alignment(Alignment::Right),
    status_area,
  );
}

/// Views joined by `›`, the top of the stack highlighted
fn path_line(path: &[String]) -> Line<'static> {
  let Some((current, parents)) = path.split_last() else {
    return Line::default();
  };

  let mut spans = vec![Span::raw(" ")];
  for parent in parents {
    spans.push(Span::styled(parent.clone(), Style::default().fg(Color::White)));
    spans.push(Span::styled(" › ", Style::default().fg(Color::DarkGray)));
  }
  spans.push(Span::styled(current.clone(), Style::default().fg(Color::Cyan).bold()));
  Line::from(spans)
}
