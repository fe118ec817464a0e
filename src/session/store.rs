//! Credential persistence: the auth token and the secondary user key.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user_key";

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("could not determine data directory")]
  NoDataDir,
  #[error("failed to create session directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("session database: {0}")]
  Sqlite(#[from] rusqlite::Error),
  #[error("session store lock poisoned")]
  Poisoned,
}

/// Durable client-side credentials, written on login and removed on logout.
pub trait CredentialStore: Send + Sync {
  fn load_token(&self) -> Result<Option<String>, StoreError>;

  fn load_user_key(&self) -> Result<Option<String>, StoreError>;

  /// Persist both values together.
  fn save(&self, token: &str, user_key: &str) -> Result<(), StoreError>;

  fn clear(&self) -> Result<(), StoreError>;
}

/// Store that lives only as long as the process. Used by tests and dry runs.
#[derive(Default)]
pub struct MemoryCredentialStore {
  values: Mutex<HashMap<&'static str, String>>,
}

impl MemoryCredentialStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
    Ok(values.get(key).cloned())
  }
}

impl CredentialStore for MemoryCredentialStore {
  fn load_token(&self) -> Result<Option<String>, StoreError> {
    self.get(TOKEN_KEY)
  }

  fn load_user_key(&self) -> Result<Option<String>, StoreError> {
    self.get(USER_KEY)
  }

  fn save(&self, token: &str, user_key: &str) -> Result<(), StoreError> {
    let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
    values.insert(TOKEN_KEY, token.to_string());
    values.insert(USER_KEY, user_key.to_string());
    Ok(())
  }

  fn clear(&self) -> Result<(), StoreError> {
    let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
    values.clear();
    Ok(())
  }
}

/// SQLite-backed credential store.
pub struct SqliteCredentialStore {
  conn: Mutex<Connection>,
}

const SESSION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS session (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteCredentialStore {
  /// Open the store at the default location (`<data_dir>/hrdash/session.db`).
  pub fn open() -> Result<Self, StoreError> {
    let path = crate::config::data_dir()
      .ok_or(StoreError::NoDataDir)?
      .join("session.db");
    Self::open_at(&path)
  }

  pub fn open_at(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    Self::from_connection(Connection::open(path)?)
  }

  #[cfg(test)]
  pub fn in_memory() -> Result<Self, StoreError> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  fn from_connection(conn: Connection) -> Result<Self, StoreError> {
    conn.execute_batch(SESSION_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
    let value = conn
      .query_row(
        "SELECT value FROM session WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }
}

impl CredentialStore for SqliteCredentialStore {
  fn load_token(&self) -> Result<Option<String>, StoreError> {
    self.get(TOKEN_KEY)
  }

  fn load_user_key(&self) -> Result<Option<String>, StoreError> {
    self.get(USER_KEY)
  }

  fn save(&self, token: &str, user_key: &str) -> Result<(), StoreError> {
    let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
    let tx = conn.transaction()?;

    for (key, value) in [(TOKEN_KEY, token), (USER_KEY, user_key)] {
      tx.execute(
        "INSERT OR REPLACE INTO session (key, value, stored_at) VALUES (?, ?, datetime('now'))",
        params![key, value],
      )?;
    }

    tx.commit()?;
    Ok(())
  }

  fn clear(&self) -> Result<(), StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
    conn.execute(
      "DELETE FROM session WHERE key IN (?, ?)",
      params![TOKEN_KEY, USER_KEY],
    )?;
    Ok(())
  }
}
