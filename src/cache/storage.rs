//! Session-scoped key/value storage backing the second cache tier.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// String key/value storage that lives as long as one client session.
pub trait SessionStore: Send + Sync {
  fn get_item(&self, key: &str) -> Result<Option<String>>;

  fn set_item(&self, key: &str, value: &str) -> Result<()>;

  fn remove_item(&self, key: &str) -> Result<()>;
}

impl SessionStore for Box<dyn SessionStore> {
  fn get_item(&self, key: &str) -> Result<Option<String>> {
    (**self).get_item(key)
  }

  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    (**self).set_item(key, value)
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    (**self).remove_item(key)
  }
}

/// Storage that keeps nothing. Every read misses.
pub struct NoopStorage;

impl SessionStore for NoopStorage {
  fn get_item(&self, _key: &str) -> Result<Option<String>> {
    Ok(None)
  }

  fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
    Ok(())
  }

  fn remove_item(&self, _key: &str) -> Result<()> {
    Ok(())
  }
}

/// In-process storage with an optional byte quota (keys + values).
#[derive(Default)]
pub struct MemorySessionStore {
  items: Mutex<HashMap<String, String>>,
  quota_bytes: Option<usize>,
}

impl MemorySessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Writes that would push usage past `bytes` fail.
  pub fn with_quota(bytes: usize) -> Self {
    Self {
      items: Mutex::new(HashMap::new()),
      quota_bytes: Some(bytes),
    }
  }

  pub fn len(&self) -> usize {
    self.items.lock().map(|items| items.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl SessionStore for MemorySessionStore {
  fn get_item(&self, key: &str) -> Result<Option<String>> {
    let items = self
      .items
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(items.get(key).cloned())
  }

  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    let mut items = self
      .items
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    if let Some(quota) = self.quota_bytes {
      let used: usize = items
        .iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| k.len() + v.len())
        .sum();
      let needed = used + key.len() + value.len();
      if needed > quota {
        return Err(eyre!(
          "Session storage quota exceeded ({} of {} bytes)",
          needed,
          quota
        ));
      }
    }

    items.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    let mut items = self
      .items
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    items.remove(key);
    Ok(())
  }
}

/// SQLite-backed session storage.
///
/// All processes share one database file, but rows are keyed by a session
/// id unique to this process and removed when the store is dropped, so a
/// session never sees another session's values.
pub struct SqliteSessionStore {
  conn: Mutex<Connection>,
  session_id: String,
}

impl SqliteSessionStore {
  /// Open the shared database at the default location with a fresh session.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session storage directory: {}", e))?;
    }

    let conn = Connection::open(&path).map_err(|e| {
      eyre!(
        "Failed to open session storage at {}: {}",
        path.display(),
        e
      )
    })?;

    Self::with_connection(conn, new_session_id())
  }

  /// Private database, mainly for tests.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory session storage: {}", e))?;
    Self::with_connection(conn, new_session_id())
  }

  fn with_connection(conn: Connection, session_id: String) -> Result<Self> {
    conn
      .execute_batch(SESSION_SCHEMA)
      .map_err(|e| eyre!("Failed to run session storage migrations: {}", e))?;

    // Sessions that never shut down cleanly
    let cutoff = Utc::now().timestamp_millis() - ABANDONED_SESSION_MILLIS;
    conn
      .execute(
        "DELETE FROM session_items WHERE written_at < ?",
        params![cutoff],
      )
      .map_err(|e| eyre!("Failed to purge abandoned sessions: {}", e))?;

    debug!(session_id = %session_id, "Opened session storage");
    Ok(Self {
      conn: Mutex::new(conn),
      session_id,
    })
  }

  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("lensdesk").join("session.db"))
  }

  pub fn session_id(&self) -> &str {
    &self.session_id
  }
}

const ABANDONED_SESSION_MILLIS: i64 = 24 * 60 * 60 * 1000;

const SESSION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS session_items (
    session_id TEXT NOT NULL,
    item_key TEXT NOT NULL,
    value TEXT NOT NULL,
    written_at INTEGER NOT NULL,
    PRIMARY KEY (session_id, item_key)
);
"#;

fn new_session_id() -> String {
  format!(
    "{}-{}",
    std::process::id(),
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
  )
}

impl SessionStore for SqliteSessionStore {
  fn get_item(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM session_items WHERE session_id = ? AND item_key = ?",
        params![self.session_id, key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read session item {}: {}", key, e))
  }

  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO session_items (session_id, item_key, value, written_at)
         VALUES (?, ?, ?, ?)",
        params![self.session_id, key, value, Utc::now().timestamp_millis()],
      )
      .map_err(|e| eyre!("Failed to write session item {}: {}", key, e))?;

    Ok(())
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM session_items WHERE session_id = ? AND item_key = ?",
        params![self.session_id, key],
      )
      .map_err(|e| eyre!("Failed to remove session item {}: {}", key, e))?;

    Ok(())
  }
}

impl Drop for SqliteSessionStore {
  fn drop(&mut self) {
    if let Ok(conn) = self.conn.lock() {
      let _ = conn.execute(
        "DELETE FROM session_items WHERE session_id = ?",
        params![self.session_id],
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_memory_store_round_trip() {
    let store = MemorySessionStore::new();
    store.set_item("k", "v").unwrap();
    assert_eq!(store.get_item("k").unwrap().as_deref(), Some("v"));

    store.remove_item("k").unwrap();
    assert_eq!(store.get_item("k").unwrap(), None);
    assert!(store.is_empty());
  }

  #[test]
  fn test_memory_store_quota() {
    let store = MemorySessionStore::with_quota(10);
    store.set_item("ab", "cdef").unwrap();
    assert!(store.set_item("gh", "ijklmnop").is_err());

    // Overwriting an existing key only counts the new value
    store.set_item("ab", "12345678").unwrap();
    assert_eq!(store.get_item("ab").unwrap().as_deref(), Some("12345678"));
  }

  #[test]
  fn test_noop_store_always_misses() {
    let store = NoopStorage;
    store.set_item("k", "v").unwrap();
    assert_eq!(store.get_item("k").unwrap(), None);
  }

  #[test]
  fn test_sqlite_store_round_trip() {
    let store = SqliteSessionStore::open_in_memory().unwrap();
    assert_eq!(store.get_item("meta:shops").unwrap(), None);

    store.set_item("meta:shops", "[1,2]").unwrap();
    store.set_item("meta:shops", "[3]").unwrap();
    assert_eq!(store.get_item("meta:shops").unwrap().as_deref(), Some("[3]"));

    store.remove_item("meta:shops").unwrap();
    assert_eq!(store.get_item("meta:shops").unwrap(), None);
  }

  #[test]
  fn test_sqlite_sessions_are_isolated() {
    let conn = Connection::open_in_memory().unwrap();
    let store = SqliteSessionStore::with_connection(conn, "a".to_string()).unwrap();

    // A row left by another session in the same database
    {
      let conn = store.conn.lock().unwrap();
      conn
        .execute(
          "INSERT INTO session_items (session_id, item_key, value, written_at) VALUES (?, ?, ?, ?)",
          params!["b", "k", "from b", Utc::now().timestamp_millis()],
        )
        .unwrap();
    }

    assert_eq!(store.get_item("k").unwrap(), None);
    store.set_item("k", "from a").unwrap();
    assert_eq!(store.get_item("k").unwrap().as_deref(), Some("from a"));
  }
}
