use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back, or quit from the root)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, edit, etc.) and return
/// actions for the App to execute: App → View → Components
///
/// Views that load data asynchronously should use Query<T> internally and
/// poll it in the tick() method.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to allow views to poll async queries
  fn tick(&mut self) {}

  /// Called when the view above this one was popped
  fn resume(&mut self) {}

  /// Short status shown at the right of the footer
  fn status_line(&self) -> Option<String> {
    None
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("q", "back").with_priority(90)]
  }
}
