pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Breadcrumb
    ])
    .split(frame.area());

  let shortcuts = app
    .current_view()
    .map(|v| v.shortcuts())
    .unwrap_or_default();
  renderfns::draw_header(frame, chunks[0], app.title(), &shortcuts);

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  let status = app.current_view().and_then(|v| v.status_line());
  renderfns::draw_footer(frame, chunks[2], &app.view_breadcrumb(), status.as_deref());
}
