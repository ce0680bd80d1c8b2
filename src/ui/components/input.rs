use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Result of handling a key event in an input component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
  /// Key moved the cursor, the value is unchanged
  Consumed,
  /// Key edited the value
  Edited,
  /// Enter pressed, here's the submitted value
  Submitted(String),
  /// Escape pressed, input cancelled
  Cancelled,
  /// Key not handled, pass to next handler
  NotHandled,
}

/// Single-line text input. The cursor counts characters, not bytes.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  buffer: String,
  cursor: usize,
}

impl TextInput {
  pub fn new() -> Self {
    Self::default()
  }

  /// Get the current input value
  pub fn value(&self) -> &str {
    &self.buffer
  }

  /// Clear the input
  pub fn clear(&mut self) {
    self.buffer.clear();
    self.cursor = 0;
  }

  /// Cursor position in characters
  pub fn cursor_position(&self) -> usize {
    self.cursor
  }

  fn char_count(&self) -> usize {
    self.buffer.chars().count()
  }

  /// Byte offset of the character at `pos`
  fn byte_index(&self, pos: usize) -> usize {
    self
      .buffer
      .char_indices()
      .nth(pos)
      .map(|(i, _)| i)
      .unwrap_or(self.buffer.len())
  }

  /// Handle a key event, returning the result
  pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Esc => InputResult::Cancelled,
      KeyCode::Enter => InputResult::Submitted(self.buffer.clone()),
      KeyCode::Backspace => {
        if self.cursor == 0 {
          return InputResult::Consumed;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.buffer.remove(at);
        InputResult::Edited
      }
      KeyCode::Delete => {
        if self.cursor >= self.char_count() {
          return InputResult::Consumed;
        }
        let at = self.byte_index(self.cursor);
        self.buffer.remove(at);
        InputResult::Edited
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        InputResult::Consumed
      }
      KeyCode::Right => {
        self.cursor = (self.cursor + 1).min(self.char_count());
        InputResult::Consumed
      }
      KeyCode::Home => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::End => {
        self.cursor = self.char_count();
        InputResult::Consumed
      }
      KeyCode::Char('a') if ctrl => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('e') if ctrl => {
        self.cursor = self.char_count();
        InputResult::Consumed
      }
      KeyCode::Char('u') if ctrl => {
        // Clear line before cursor
        let at = self.byte_index(self.cursor);
        self.buffer.drain(..at);
        self.cursor = 0;
        InputResult::Edited
      }
      KeyCode::Char('w') if ctrl => {
        // Delete word before cursor
        let at = self.byte_index(self.cursor);
        let before = self.buffer[..at].trim_end();
        let start = before.rfind(' ').map(|i| i + 1).unwrap_or(0);
        self.buffer.drain(start..at);
        self.cursor = self.buffer[..start].chars().count();
        InputResult::Edited
      }
      KeyCode::Char(_) if ctrl => InputResult::NotHandled,
      KeyCode::Char(c) => {
        let at = self.byte_index(self.cursor);
        self.buffer.insert(at, c);
        self.cursor += 1;
        InputResult::Edited
      }
      _ => InputResult::NotHandled,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl_key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::CONTROL)
  }

  fn type_str(input: &mut TextInput, s: &str) {
    for c in s.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_basic_input() {
    let mut input = TextInput::new();
    assert!(input.value().is_empty());

    assert_eq!(input.handle_key(key(KeyCode::Char('h'))), InputResult::Edited);
    input.handle_key(key(KeyCode::Char('i')));
    assert_eq!(input.value(), "hi");
  }

  #[test]
  fn test_submit_and_cancel() {
    let mut input = TextInput::new();
    type_str(&mut input, "test");
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      InputResult::Submitted("test".to_string())
    );
    assert_eq!(input.handle_key(key(KeyCode::Esc)), InputResult::Cancelled);
  }

  #[test]
  fn test_cursor_movement_is_not_an_edit() {
    let mut input = TextInput::new();
    type_str(&mut input, "ac");
    assert_eq!(input.handle_key(key(KeyCode::Left)), InputResult::Consumed);
    input.handle_key(key(KeyCode::Char('b')));
    assert_eq!(input.value(), "abc");
    assert_eq!(input.cursor_position(), 2);
  }

  #[test]
  fn test_backspace_at_start() {
    let mut input = TextInput::new();
    assert_eq!(
      input.handle_key(key(KeyCode::Backspace)),
      InputResult::Consumed
    );
    type_str(&mut input, "abc");
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "ab");
  }

  #[test]
  fn test_multibyte_editing() {
    let mut input = TextInput::new();
    type_str(&mut input, "Zoë");
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "Zo");
    type_str(&mut input, "ë B");
    input.handle_key(key(KeyCode::Home));
    input.handle_key(key(KeyCode::Delete));
    assert_eq!(input.value(), "oë B");
  }

  #[test]
  fn test_ctrl_u_clear_before_cursor() {
    let mut input = TextInput::new();
    type_str(&mut input, "hello world");
    for _ in 0..5 {
      input.handle_key(key(KeyCode::Left));
    }
    input.handle_key(ctrl_key(KeyCode::Char('u')));
    assert_eq!(input.value(), "world");
    assert_eq!(input.cursor_position(), 0);
  }

  #[test]
  fn test_ctrl_w_delete_word() {
    let mut input = TextInput::new();
    type_str(&mut input, "jane doe ");
    input.handle_key(ctrl_key(KeyCode::Char('w')));
    assert_eq!(input.value(), "jane ");
    assert_eq!(input.cursor_position(), 5);
  }
}
