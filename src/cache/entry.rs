//! Per-key cache bookkeeping.

use futures::channel::oneshot;
use futures::future::Shared;
use tokio::time::Instant;

/// Result of a producer. Errors are plain messages so they can be cloned to
/// every caller sharing one producer run.
pub type ProduceResult<T> = Result<T, String>;

pub(super) type ComputationChannel<T> = Shared<oneshot::Receiver<ProduceResult<T>>>;

/// A producer run that has not settled yet.
pub(super) struct InFlight<T> {
  /// Distinguishes this run from later runs for the same key, so a run that
  /// was evicted cannot write into a newer entry.
  pub generation: u64,
  pub channel: ComputationChannel<T>,
}

/// One cache slot.
pub(super) struct CacheEntry<T> {
  pub value: Option<T>,
  pub expires_at: Option<Instant>,
  pub in_flight: Option<InFlight<T>>,
}

impl<T> Default for CacheEntry<T> {
  fn default() -> Self {
    Self {
      value: None,
      expires_at: None,
      in_flight: None,
    }
  }
}

impl<T> CacheEntry<T> {
  /// The stored value, if it has not expired at `now`.
  pub fn fresh_value(&self, now: Instant) -> Option<&T> {
    match (&self.value, self.expires_at) {
      (Some(value), Some(expires_at)) if now <= expires_at => Some(value),
      _ => None,
    }
  }

  pub fn is_fresh(&self, now: Instant) -> bool {
    self.fresh_value(now).is_some()
  }

  /// Whether this run is still the one recorded for the entry.
  pub fn owns_in_flight(&self, generation: u64) -> bool {
    self
      .in_flight
      .as_ref()
      .is_some_and(|f| f.generation == generation)
  }

  /// Nothing cached and nothing running.
  pub fn is_vacant(&self) -> bool {
    self.value.is_none() && self.in_flight.is_none()
  }
}

/// Counters for cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
  /// Served from a fresh entry
  pub hits: u64,
  /// Started a new producer run
  pub misses: u64,
  /// Joined a producer run that was already in flight
  pub deduplicated: u64,
  /// Producer runs that failed
  pub failures: u64,
  /// Producer results dropped because their entry was evicted meanwhile
  pub discarded: u64,
}
