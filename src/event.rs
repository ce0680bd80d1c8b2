use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal was resized; the next draw picks up the new size
  Resize,
  /// Periodic tick for settling searches and polling queries
  Tick,
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // crossterm polling blocks, keep it off the async workers
    tokio::task::spawn_blocking(move || loop {
      let event = match event::poll(tick_rate) {
        Ok(true) => match event::read() {
          Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
          Ok(CrosstermEvent::Resize(..)) => Event::Resize,
          Ok(_) => continue,
          Err(e) => {
            warn!("failed to read terminal event: {}", e);
            continue;
          }
        },
        Ok(false) => Event::Tick,
        Err(e) => {
          warn!("failed to poll terminal events: {}", e);
          Event::Tick
        }
      };
      if tx.send(event).is_err() {
        break;
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
