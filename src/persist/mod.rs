//! Durable state that survives a restart.
//!
//! Values are serialized to JSON and written through to a [`DurableStore`]
//! on every change. Reads fall back to a caller default when nothing usable
//! is stored.

mod state;
mod store;

pub use state::{Persisted, PersistedState};
pub use store::{DurableStore, MemoryStore, SqliteStore};
