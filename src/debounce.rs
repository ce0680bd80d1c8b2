//! Debounced values.
//!
//! A [`Debounced<T>`] collapses a burst of source changes into one settled
//! value, emitted once the source has been quiet for the configured delay.
//!
//! ```ignore
//! let mut search = Debounced::new(String::new(), Duration::from_millis(300));
//!
//! // On each keystroke
//! search.set(input.value().to_string());
//!
//! // In event loop tick
//! if search.poll_changed() {
//!     refetch(search.settled());
//! }
//! ```

use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// A value that settles after `delay` without further changes.
///
/// The timer runs on a background task that lives as long as this handle.
#[derive(Debug)]
pub struct Debounced<T> {
  source: T,
  source_tx: mpsc::UnboundedSender<T>,
  settled_rx: watch::Receiver<T>,
}

impl<T> Debounced<T>
where
  T: Clone + PartialEq + Send + Sync + 'static,
{
  /// Create a debounced value. Both source and settled start at `initial`.
  ///
  /// Must be called from within a tokio runtime.
  pub fn new(initial: T, delay: Duration) -> Self {
    let (source_tx, source_rx) = mpsc::unbounded_channel();
    let (settled_tx, settled_rx) = watch::channel(initial.clone());

    tokio::spawn(settle(source_rx, settled_tx, delay));

    Self {
      source: initial,
      source_tx,
      settled_rx,
    }
  }

  /// Latest source value, possibly not settled yet.
  pub fn source(&self) -> &T {
    &self.source
  }

  /// Latest settled value.
  pub fn settled(&self) -> T {
    self.settled_rx.borrow().clone()
  }

  /// Change the source value, restarting the quiet period.
  ///
  /// Setting the value it already has is not a change. Never blocks; even
  /// with a zero delay the settled value is updated on a later scheduler
  /// turn.
  pub fn set(&mut self, value: T) {
    if value == self.source {
      return;
    }
    self.source = value.clone();
    // The task only stops once this handle is dropped.
    let _ = self.source_tx.send(value);
  }

  /// Check (and acknowledge) whether a new settled value is available.
  pub fn poll_changed(&mut self) -> bool {
    let changed = self.settled_rx.has_changed().unwrap_or(false);
    if changed {
      self.settled_rx.borrow_and_update();
    }
    changed
  }

  /// Wait for the next settled value.
  pub async fn changed(&mut self) -> Option<T> {
    self.settled_rx.changed().await.ok()?;
    Some(self.settled_rx.borrow_and_update().clone())
  }
}

/// Background task: hold the newest source value until `delay` passes with
/// no newer one, then publish it.
async fn settle<T>(
  mut source_rx: mpsc::UnboundedReceiver<T>,
  settled_tx: watch::Sender<T>,
  delay: Duration,
) where
  T: PartialEq,
{
  let mut pending: Option<T> = None;

  loop {
    match pending.take() {
      None => match source_rx.recv().await {
        Some(value) => pending = Some(value),
        None => break,
      },
      Some(value) => {
        tokio::select! {
          next = source_rx.recv() => match next {
            Some(newer) => pending = Some(newer),
            None => break,
          },
          _ = tokio::time::sleep(delay) => {
            settled_tx.send_if_modified(|settled| {
              if *settled == value {
                false
              } else {
                *settled = value;
                true
              }
            });
          }
        }
      }
    }
  }
}
