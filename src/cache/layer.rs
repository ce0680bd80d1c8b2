//! Cache layer that de-duplicates and memoizes async producers.

use futures::channel::oneshot;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::entry::{CacheEntry, CacheStats, ComputationChannel, InFlight, ProduceResult};

/// Expiry used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

struct CacheState<T> {
  entries: HashMap<String, CacheEntry<T>>,
  next_generation: u64,
  stats: CacheStats,
}

/// Keyed response cache.
///
/// Stores the result of an async producer under a string key for a TTL.
/// Concurrent requests for the same key share one producer run. Failed runs
/// are never cached.
///
/// The layer is a cheap handle: clones share the same entries. Create one per
/// value type and pass it to whoever needs it.
pub struct CacheLayer<T> {
  state: Arc<Mutex<CacheState<T>>>,
}

impl<T> CacheLayer<T>
where
  T: Clone + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      state: Arc::new(Mutex::new(CacheState {
        entries: HashMap::new(),
        next_generation: 0,
        stats: CacheStats::default(),
      })),
    }
  }

  /// Return the cached value for `key`, or run `producer` to obtain it.
  ///
  /// 1. A fresh entry resolves immediately without calling `producer`
  /// 2. A run already in flight for `key` is joined, `producer` is not called
  /// 3. Otherwise `producer` runs on the tokio runtime; on success the value
  ///    is stored until `now + ttl`, on failure nothing is stored and the
  ///    error goes to every caller waiting on this run
  ///
  /// A zero `ttl` never stores a value, but concurrent callers still share a
  /// single run. The run completes even if every caller stops waiting.
  pub async fn get_or_produce<F, Fut>(
    &self,
    key: &str,
    producer: F,
    ttl: Duration,
  ) -> ProduceResult<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ProduceResult<T>> + Send + 'static,
  {
    let (channel, start) = {
      let mut state = self.state.lock();
      let CacheState {
        entries,
        next_generation,
        stats,
      } = &mut *state;
      let entry = entries.entry(key.to_string()).or_default();

      if let Some(value) = entry.fresh_value(Instant::now()) {
        stats.hits += 1;
        debug!("cache hit for {}", key);
        return Ok(value.clone());
      }

      if let Some(in_flight) = &entry.in_flight {
        stats.deduplicated += 1;
        debug!("joining in-flight producer for {}", key);
        (in_flight.channel.clone(), None)
      } else {
        stats.misses += 1;
        *next_generation += 1;
        let generation = *next_generation;
        let (sender, receiver) = oneshot::channel();
        let channel: ComputationChannel<T> = receiver.shared();
        entry.in_flight = Some(InFlight {
          generation,
          channel: channel.clone(),
        });
        debug!("cache miss for {}, starting producer", key);
        (channel, Some((generation, sender)))
      }
    };

    // The in-flight slot is registered before the producer is called, so the
    // lock is never held while caller code runs.
    if let Some((generation, sender)) = start {
      self.spawn_producer(key.to_string(), generation, producer(), ttl, sender);
    }

    match channel.await {
      Ok(result) => result,
      Err(oneshot::Canceled) => Err("Producer was cancelled".to_string()),
    }
  }

  fn spawn_producer<Fut>(
    &self,
    key: String,
    generation: u64,
    future: Fut,
    ttl: Duration,
    sender: oneshot::Sender<ProduceResult<T>>,
  ) where
    Fut: Future<Output = ProduceResult<T>> + Send + 'static,
  {
    let state = Arc::clone(&self.state);

    tokio::spawn(async move {
      let result = AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err("Producer panicked".to_string()));

      // Settle the entry before waking waiters: anyone arriving afterwards
      // either sees the stored value or starts a new run.
      {
        let mut state = state.lock();
        let CacheState { entries, stats, .. } = &mut *state;

        let vacant = match entries.get_mut(&key) {
          Some(entry) if entry.owns_in_flight(generation) => {
            entry.in_flight = None;
            match &result {
              Ok(value) if !ttl.is_zero() => {
                entry.value = Some(value.clone());
                entry.expires_at = Some(expiry(ttl));
              }
              Ok(_) => {
                entry.value = None;
                entry.expires_at = None;
              }
              Err(e) => {
                stats.failures += 1;
                debug!("producer for {} failed: {}", key, e);
              }
            }
            entry.is_vacant()
          }
          _ => {
            stats.discarded += 1;
            debug!("discarding producer result for evicted key {}", key);
            false
          }
        };

        if vacant {
          entries.remove(&key);
        }
      }

      // Receivers may all be gone; the value is cached regardless.
      let _ = sender.send(result);
    });
  }

  /// Remove the entry for `key`, including any in-flight reference.
  ///
  /// A producer still running for it keeps going, but its result is not
  /// stored and later callers start a fresh run.
  pub fn evict(&self, key: &str) -> bool {
    let removed = self.state.lock().entries.remove(key).is_some();
    if removed {
      debug!("evicted {}", key);
    }
    removed
  }

  /// Remove every entry whose key starts with `prefix`. Returns the count.
  pub fn evict_by_prefix(&self, prefix: &str) -> usize {
    let mut state = self.state.lock();
    let before = state.entries.len();
    state.entries.retain(|key, _| !key.starts_with(prefix));
    let removed = before - state.entries.len();
    debug!("evicted {} entries with prefix {}", removed, prefix);
    removed
  }

  /// Drop expired values that have no producer running.
  pub fn purge_expired(&self) -> usize {
    let now = Instant::now();
    let mut state = self.state.lock();
    let before = state.entries.len();
    state
      .entries
      .retain(|_, entry| entry.in_flight.is_some() || entry.is_fresh(now));
    before - state.entries.len()
  }

  pub fn stats(&self) -> CacheStats {
    self.state.lock().stats
  }

  pub fn len(&self) -> usize {
    self.state.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

fn expiry(ttl: Duration) -> Instant {
  let now = Instant::now();
  now.checked_add(ttl).unwrap_or(now + FAR_FUTURE)
}

impl<T> Default for CacheLayer<T>
where
  T: Clone + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Clone for CacheLayer<T> {
  fn clone(&self) -> Self {
    Self {
      state: Arc::clone(&self.state),
    }
  }
}

impl<T> std::fmt::Debug for CacheLayer<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.state.lock();
    f.debug_struct("CacheLayer")
      .field("entries", &state.entries.len())
      .field("stats", &state.stats)
      .finish()
  }
}
