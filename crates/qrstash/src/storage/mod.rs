//! Persistence port for qrstash.
//!
//! The category registry and the record store never touch a database
//! directly. They read and rewrite whole collections through the
//! [`KeyValueStore`] trait, which has a `SQLite`-backed implementation for
//! real use and an in-memory one for tests.

pub mod migrations;
pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Keys of the persisted collections.
pub mod keys {
    /// Ordered list of category labels.
    pub const TABS: &str = "qrTabs";
    /// Ordered list of saved QR records.
    pub const SAVED_QRS: &str = "savedQRs";
    /// Set once the default categories have been seeded.
    pub const FIRST_LAUNCH: &str = "firstLaunch";
}

/// A durable map from string keys to JSON values.
///
/// `set` replaces the whole value for a key and must be atomic from the
/// caller's point of view: a reader sees either the old or the new value.
pub trait KeyValueStore {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Read a boolean flag, treating anything other than `true` as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get_flag(&self, key: &str) -> Result<bool> {
        Ok(matches!(self.get(key)?, Some(Value::Bool(true))))
    }

    /// Store a boolean flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        self.set(key, &Value::Bool(value))
    }
}

/// `SQLite`-backed preference store.
///
/// Every value lives in one row of the `preferences` table as JSON text, so
/// rewriting a collection is a single `INSERT OR REPLACE`.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a preference database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Ignoring unreadable value stored under {}: {}", key, e);
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.conn.execute(
            r"
            INSERT OR REPLACE INTO preferences (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ",
            params![key, raw],
        )?;
        debug!("Persisted {} ({} bytes)", key, raw.len());
        Ok(())
    }
}

/// In-memory preference store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.clone());
        Ok(())
    }
}
