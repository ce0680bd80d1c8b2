use crate::api::CachedHrClient;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::persist::{DurableStore, MemoryStore, PersistedState, SqliteStore};
use crate::ui;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::EmployeeListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Tick rate; bounds how late a settled search is noticed
const TICK_RATE: Duration = Duration::from_millis(50);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Header title
  title: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  /// Build the client, persisted state and root view.
  ///
  /// Must be called from within a tokio runtime.
  pub fn new(config: Config, persist: bool) -> Result<Self> {
    let client = CachedHrClient::new(&config)?;
    let state = PersistedState::new(open_store(&config, persist)?);
    let root = EmployeeListView::new(client, &state, &config.ui);

    Ok(Self {
      view_stack: vec![Box::new(root)],
      title: config.display_title(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.main_loop(&mut terminal).await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    info!("shutting down");
    Ok(())
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Pop,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          if let Some(view) = self.view_stack.last_mut() {
            view.resume();
          }
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn tick(&mut self) {
    // Views below the top keep their queries settling in the background
    for view in &mut self.view_stack {
      view.tick();
    }
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}

/// Durable store for persisted state: SQLite at the configured or default
/// path, or memory only.
fn open_store(config: &Config, persist: bool) -> Result<Arc<dyn DurableStore>> {
  if !persist {
    info!("state persistence disabled");
    return Ok(Arc::new(MemoryStore::new()));
  }

  let store = match &config.state_path {
    Some(path) => SqliteStore::open(path)?,
    None => SqliteStore::open_default()?,
  };
  Ok(Arc::new(store))
}
