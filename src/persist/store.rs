//! Durable key-value store trait and SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Trait for durable key-value backends.
///
/// Keys and values are plain strings; serialization is the caller's job.
/// All operations are synchronous.
pub trait DurableStore: Send + Sync {
  /// Read the value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Remove `key`. Removing a missing key is not an error.
  fn remove(&self, key: &str) -> Result<()>;
}

/// Store that lives only as long as the process.
/// Used when persistence is disabled and in tests.
#[derive(Default)]
pub struct MemoryStore {
  values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl DurableStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.values.lock().get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    self.values.lock().insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    self.values.lock().remove(key);
    Ok(())
  }
}

/// SQLite-based durable store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Open or create the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create state directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open state database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a store that is discarded when dropped.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory state database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;
    Ok(store)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("hrdesk").join("state.db"))
  }

  /// Run database migrations for the state table.
  fn run_migrations(&self) -> Result<()> {
    self
      .conn
      .lock()
      .execute_batch(STATE_SCHEMA)
      .map_err(|e| eyre!("Failed to run state migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the state table.
const STATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl DurableStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.conn.lock();

    conn
      .query_row(
        "SELECT value FROM kv_state WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read state '{}': {}", key, e))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.conn.lock();

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_state (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write state '{}': {}", key, e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self.conn.lock();

    conn
      .execute("DELETE FROM kv_state WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove state '{}': {}", key, e))?;

    Ok(())
  }
}
