use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by search input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Search text changed (on each edit, empty string on cancel)
  Changed(String),
  /// Search submitted (overlay closed, term persists)
  Submitted,
}

/// Search input component with activation/deactivation.
///
/// Edits are reported immediately; the parent decides when a term is
/// settled enough to act on.
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Get the current search text
  pub fn query(&self) -> &str {
    self.input.value()
  }

  /// Handle a key event
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        // Reopening keeps the current term for editing
        self.active = true;
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted)
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(SearchEvent::Changed(String::new()))
      }
      InputResult::Edited => KeyResult::Event(SearchEvent::Changed(self.query().to_string())),
      InputResult::Consumed => KeyResult::Handled,
      // Swallow everything else while typing
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the search overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = 3.min(area.height); // Input line with borders
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width.saturating_sub(1), height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Search ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let input_line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
    ]);
    frame.render_widget(Paragraph::new(input_line), inner);

    // "/" takes one column before the text
    let cursor_x = inner.x + 1 + self.input.cursor_position() as u16;
    if cursor_x < inner.right() {
      frame.set_cursor_position((cursor_x, inner.y));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_inactive_ignores_keys() {
    let mut search = SearchInput::new();
    assert_eq!(
      search.handle_key(key(KeyCode::Char('j'))),
      KeyResult::NotHandled
    );
  }

  #[test]
  fn test_edits_emit_changes() {
    let mut search = SearchInput::new();
    assert_eq!(
      search.handle_key(key(KeyCode::Char('/'))),
      KeyResult::Handled
    );
    assert!(search.is_active());
    assert_eq!(
      search.handle_key(key(KeyCode::Char('a'))),
      KeyResult::Event(SearchEvent::Changed("a".to_string()))
    );
    assert_eq!(search.handle_key(key(KeyCode::Left)), KeyResult::Handled);
    assert_eq!(
      search.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(SearchEvent::Submitted)
    );
    assert!(!search.is_active());
    assert_eq!(search.query(), "a");
  }

  #[test]
  fn test_cancel_clears_term() {
    let mut search = SearchInput::new();
    search.handle_key(key(KeyCode::Char('/')));
    search.handle_key(key(KeyCode::Char('x')));
    assert_eq!(
      search.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(SearchEvent::Changed(String::new()))
    );
    assert_eq!(search.query(), "");
  }
}
