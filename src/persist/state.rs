//! Named values mirrored to a durable store.

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use super::store::DurableStore;

/// Shared source of truth for one key.
struct Slot {
  /// `None` until something has been stored for the key.
  current: watch::Sender<Option<Value>>,
  /// Serializes the memory update and the store write of concurrent setters,
  /// so the last value in memory is also the last one written.
  write: Mutex<()>,
}

/// Registry of persisted values backed by a [`DurableStore`].
///
/// Every [`Persisted`] handle opened for the same key shares one slot, so
/// handles never diverge: the last `set` wins and every handle (including
/// ones opened later) reads it.
#[derive(Clone)]
pub struct PersistedState {
  store: Arc<dyn DurableStore>,
  slots: Arc<Mutex<HashMap<String, Arc<Slot>>>>,
}

impl PersistedState {
  pub fn new(store: Arc<dyn DurableStore>) -> Self {
    Self {
      store,
      slots: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Open the value stored under `key`, falling back to `initial` when the
  /// key is missing or its contents cannot be parsed as `T`.
  pub fn open<T>(&self, key: &str, initial: T) -> Persisted<T>
  where
    T: Serialize + DeserializeOwned + Clone,
  {
    let slot = {
      let mut slots = self.slots.lock();
      Arc::clone(slots.entry(key.to_string()).or_insert_with(|| {
        Arc::new(Slot {
          current: watch::channel(self.load(key)).0,
          write: Mutex::new(()),
        })
      }))
    };

    let persisted = Persisted {
      key: key.to_string(),
      initial,
      store: Arc::clone(&self.store),
      receiver: slot.current.subscribe(),
      slot,
    };

    if let Some(value) = persisted.receiver.borrow().as_ref() {
      if let Err(e) = serde_json::from_value::<T>(value.clone()) {
        warn!("Stored state '{}' has an unexpected shape, using default: {}", key, e);
      }
    }

    persisted
  }

  /// Read and parse the stored JSON for `key`. Failures are logged and read
  /// as "nothing stored".
  fn load(&self, key: &str) -> Option<Value> {
    let raw = match self.store.get(key) {
      Ok(raw) => raw?,
      Err(e) => {
        warn!("Failed to read stored state '{}': {}", key, e);
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(value) => Some(value),
      Err(e) => {
        warn!("Stored state '{}' is not valid JSON, using default: {}", key, e);
        None
      }
    }
  }
}

/// Handle to one persisted value.
pub struct Persisted<T> {
  key: String,
  initial: T,
  store: Arc<dyn DurableStore>,
  slot: Arc<Slot>,
  receiver: watch::Receiver<Option<Value>>,
}

impl<T> Persisted<T>
where
  T: Serialize + DeserializeOwned + Clone,
{
  /// Current value.
  pub fn get(&self) -> T {
    self
      .slot
      .current
      .borrow()
      .as_ref()
      .and_then(|value| serde_json::from_value(value.clone()).ok())
      .unwrap_or_else(|| self.initial.clone())
  }

  /// Replace the value.
  ///
  /// Memory is updated first and is visible to every handle immediately; the
  /// store write happens before this returns. A failed write is logged and
  /// otherwise ignored, the in-memory value stays authoritative.
  pub fn set(&self, value: T) {
    let json = match serde_json::to_value(&value) {
      Ok(json) => json,
      Err(e) => {
        warn!("Failed to serialize state '{}': {}", self.key, e);
        return;
      }
    };

    let _guard = self.slot.write.lock();
    let raw = json.to_string();
    self.slot.current.send_replace(Some(json));

    if let Err(e) = self.store.set(&self.key, &raw) {
      warn!("Failed to persist state '{}': {}", self.key, e);
    }
  }

  /// Apply `f` to the current value and store the result.
  pub fn update(&self, f: impl FnOnce(&mut T)) {
    let mut value = self.get();
    f(&mut value);
    self.set(value);
  }

  /// Forget the stored value; reads return the default again.
  pub fn clear(&self) {
    let _guard = self.slot.write.lock();
    self.slot.current.send_replace(None);

    if let Err(e) = self.store.remove(&self.key) {
      warn!("Failed to remove state '{}': {}", self.key, e);
    }
  }

  /// Check (and acknowledge) whether the value changed through any handle,
  /// this one included, since the last call. Meant to be polled from a tick
  /// loop.
  pub fn poll_changed(&mut self) -> bool {
    let changed = self.receiver.has_changed().unwrap_or(false);
    if changed {
      self.receiver.borrow_and_update();
    }
    changed
  }

  /// Wait for the next change made through any handle for this key.
  pub async fn changed(&mut self) -> T {
    // The sender lives in `self.slot`, so this cannot fail.
    let _ = self.receiver.changed().await;
    self.get()
  }
}

impl<T: Clone> Clone for Persisted<T> {
  fn clone(&self) -> Self {
    Self {
      key: self.key.clone(),
      initial: self.initial.clone(),
      store: Arc::clone(&self.store),
      slot: Arc::clone(&self.slot),
      receiver: self.slot.current.subscribe(),
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Persisted<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Persisted")
      .field("key", &self.key)
      .field("initial", &self.initial)
      .field("current", &*self.slot.current.borrow())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::persist::store::{MemoryStore, SqliteStore};
  use color_eyre::{eyre::eyre, Result};
  use serde::Deserialize;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Filters {
    status: String,
  }

  fn filters(status: &str) -> Filters {
    Filters {
      status: status.to_string(),
    }
  }

  /// Store whose writes always fail, like a full disk.
  struct FullStore;

  impl DurableStore for FullStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
      Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
      Err(eyre!("quota exceeded"))
    }

    fn remove(&self, _key: &str) -> Result<()> {
      Err(eyre!("quota exceeded"))
    }
  }

  #[test]
  fn test_missing_key_uses_initial() {
    let state = PersistedState::new(Arc::new(MemoryStore::new()));
    let value = state.open("filters", filters("all"));
    assert_eq!(value.get(), filters("all"));
  }

  #[test]
  fn test_round_trip_survives_reload() {
    let store: Arc<dyn DurableStore> = Arc::new(SqliteStore::open_in_memory().unwrap());

    let state = PersistedState::new(Arc::clone(&store));
    state.open("filters", filters("all")).set(filters("active"));

    // Same registry
    assert_eq!(state.open("filters", filters("all")).get(), filters("active"));

    // Fresh registry over the same store, as after a restart
    let reloaded = PersistedState::new(store);
    assert_eq!(
      reloaded.open("filters", filters("all")).get(),
      filters("active")
    );
  }

  #[test]
  fn test_unparseable_value_falls_back() {
    let store = Arc::new(MemoryStore::new());
    store.set("filters", "{not json").unwrap();
    store.set("count", r#""seven""#).unwrap();

    let state = PersistedState::new(store);
    assert_eq!(state.open("filters", filters("all")).get(), filters("all"));
    assert_eq!(state.open("count", 3u32).get(), 3);
  }

  #[test]
  fn test_handles_share_one_value() {
    let state = PersistedState::new(Arc::new(MemoryStore::new()));
    let a = state.open("filters", filters("all"));
    let b = state.open("filters", filters("all"));

    a.set(filters("active"));
    assert_eq!(b.get(), filters("active"));

    b.set(filters("terminated"));
    assert_eq!(a.get(), filters("terminated"));
  }

  #[test]
  fn test_every_write_reaches_store() {
    let store = Arc::new(MemoryStore::new());
    let state = PersistedState::new(Arc::clone(&store) as Arc<dyn DurableStore>);
    let page = state.open("page", 0u32);

    for n in 1..=100 {
      page.set(n);
      assert_eq!(store.get("page").unwrap().as_deref(), Some(n.to_string().as_str()));
    }
  }

  #[test]
  fn test_write_failure_keeps_memory_value() {
    let state = PersistedState::new(Arc::new(FullStore));
    let value = state.open("filters", filters("all"));

    value.set(filters("active"));
    assert_eq!(value.get(), filters("active"));

    value.clear();
    assert_eq!(value.get(), filters("all"));
  }

  #[test]
  fn test_update_and_clear() {
    let store = Arc::new(MemoryStore::new());
    let state = PersistedState::new(Arc::clone(&store) as Arc<dyn DurableStore>);
    let value = state.open("filters", filters("all"));

    value.update(|f| f.status.push_str("-time"));
    assert_eq!(value.get(), filters("all-time"));

    value.clear();
    assert_eq!(value.get(), filters("all"));
    assert_eq!(store.get("filters").unwrap(), None);
  }

  #[test]
  fn test_poll_changed_sees_other_handle() {
    let state = PersistedState::new(Arc::new(MemoryStore::new()));
    let writer = state.open("filters", filters("all"));
    let mut reader = state.open("filters", filters("all"));

    assert!(!reader.poll_changed());
    writer.set(filters("active"));
    assert!(reader.poll_changed());
    assert!(!reader.poll_changed());
  }

  #[tokio::test]
  async fn test_changed_notifies_subscribers() {
    let state = PersistedState::new(Arc::new(MemoryStore::new()));
    let writer = state.open("filters", filters("all"));
    let mut reader = state.open("filters", filters("all"));

    let waiter = tokio::spawn(async move { reader.changed().await });
    tokio::task::yield_now().await;
    writer.set(filters("active"));

    assert_eq!(waiter.await.unwrap(), filters("active"));
  }
}
